//! Feed assembly: newest posts with promotional items spliced in.

use serde::Serialize;

use crate::db::paths;
use crate::errors::AppError;
use crate::format::now_millis;
use crate::models::{Ad, CreateAdRequest, Post};
use crate::posts;
use crate::session::Session;

pub const DEFAULT_AD_INTERVAL: usize = 5;
pub const FEED_AD_FORMAT: &str = "card";
pub const FEED_AD_PLACEMENT: &str = "middle";

/// One entry of an assembled feed.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum FeedItem {
    Post(Post),
    /// Promoted item, never counted as organic content
    Ad(Ad),
}

impl FeedItem {
    pub fn is_ad(&self) -> bool {
        matches!(self, FeedItem::Ad(_))
    }
}

/// Splice one ad after every `interval`-th organic item.
///
/// Ads are drawn from `ads` in order and never repeated; once the pool is
/// exhausted the remaining posts follow with no further ads.
pub fn interleave_ads(
    organic: Vec<Post>,
    ads: &[Ad],
    interval: usize,
) -> Result<Vec<FeedItem>, AppError> {
    if interval == 0 {
        return Err(AppError::Validation(
            "Ad interval must be at least 1".to_string(),
        ));
    }

    let slots = (organic.len() / interval).min(ads.len());
    let mut feed = Vec::with_capacity(organic.len() + slots);
    let mut pool = ads.iter();

    for (position, post) in organic.into_iter().enumerate() {
        feed.push(FeedItem::Post(post));
        if (position + 1) % interval == 0 {
            if let Some(ad) = pool.next() {
                feed.push(FeedItem::Ad(ad.clone()));
            }
        }
    }

    Ok(feed)
}

/// Active ads for `format` and `placement`, oldest first.
pub async fn eligible_ads(session: &Session, format: &str, placement: &str) -> Result<Vec<Ad>, AppError> {
    let mut ads: Vec<Ad> = session
        .store()
        .list_as::<Ad>(paths::ADS)
        .await?
        .into_iter()
        .map(|(id, mut ad)| {
            ad.id = id;
            ad
        })
        .filter(|ad| ad.active && ad.format == format && ad.placement == placement)
        .collect();

    ads.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
    Ok(ads)
}

/// Register a promotional item.
pub async fn create_ad(session: &Session, request: CreateAdRequest) -> Result<Ad, AppError> {
    let title = request.title.trim();
    if title.is_empty() {
        return Err(AppError::Validation("Ad title is required".to_string()));
    }
    let target_url = crate::links::parse_web_url(&request.target_url)?;

    let store = session.store();
    let id = store.push_id();
    let ad = Ad {
        id: id.clone(),
        title: title.to_string(),
        body: request.body.trim().to_string(),
        image_url: request.image_url.filter(|url| !url.trim().is_empty()),
        target_url: target_url.to_string(),
        format: request.format,
        placement: request.placement,
        active: request.active,
        created_at: now_millis(),
    };

    store.write(&paths::ad(&id), &ad).await?;
    tracing::info!(id = %id, format = %ad.format, placement = %ad.placement, "Ad created");
    Ok(ad)
}

/// Newest `limit` posts with feed ads every `interval` posts.
pub async fn assemble_feed(
    session: &Session,
    limit: usize,
    interval: usize,
) -> Result<Vec<FeedItem>, AppError> {
    if interval == 0 {
        return Err(AppError::Validation(
            "Ad interval must be at least 1".to_string(),
        ));
    }

    let organic = posts::list_posts(session, limit).await?;
    let ads = match eligible_ads(session, FEED_AD_FORMAT, FEED_AD_PLACEMENT).await {
        Ok(ads) => ads,
        Err(e) => {
            tracing::warn!("Ads unavailable, serving organic feed: {}", e);
            Vec::new()
        }
    };

    let feed = interleave_ads(organic, &ads, interval)?;
    tracing::debug!(items = feed.len(), ads = ads.len(), "Feed assembled");
    Ok(feed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{test_store, DocumentStore};
    use crate::models::{default_format, default_placement};
    use crate::session::Identity;
    use serde_json::json;

    fn post(n: i64) -> Post {
        Post {
            id: format!("p{n}"),
            author_id: "u1".into(),
            author_name: "User".into(),
            author_email: String::new(),
            content: format!("post {n}"),
            created_at: 1_000 - n,
            likes: 0,
            comments: 0,
            shares: 0,
            link: None,
        }
    }

    fn ad(id: &str, created_at: i64) -> Ad {
        Ad {
            id: id.into(),
            title: format!("Ad {id}"),
            body: String::new(),
            image_url: None,
            target_url: "https://example.com".into(),
            format: default_format(),
            placement: default_placement(),
            active: true,
            created_at,
        }
    }

    fn shape(feed: &[FeedItem]) -> Vec<String> {
        feed.iter()
            .map(|item| match item {
                FeedItem::Post(p) => p.id.clone(),
                FeedItem::Ad(a) => format!("ad:{}", a.id),
            })
            .collect()
    }

    #[test]
    fn test_ads_after_every_fifth_post() {
        let organic: Vec<Post> = (1..=12).map(post).collect();
        let ads = vec![ad("a1", 1), ad("a2", 2), ad("a3", 3)];

        let feed = interleave_ads(organic, &ads, 5).unwrap();

        assert_eq!(feed.len(), 14);
        assert!(feed[5].is_ad());
        assert!(feed[11].is_ad());
        assert_eq!(
            shape(&feed),
            vec![
                "p1", "p2", "p3", "p4", "p5", "ad:a1", "p6", "p7", "p8", "p9", "p10", "ad:a2",
                "p11", "p12"
            ]
        );
    }

    #[test]
    fn test_interleave_is_deterministic() {
        let ads = vec![ad("a1", 1), ad("a2", 2)];
        let first = interleave_ads((1..=12).map(post).collect(), &ads, 5).unwrap();
        let second = interleave_ads((1..=12).map(post).collect(), &ads, 5).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_ads_never_repeat() {
        let ads = vec![ad("only", 1)];
        let feed = interleave_ads((1..=20).map(post).collect(), &ads, 5).unwrap();

        assert_eq!(feed.len(), 21);
        assert_eq!(feed.iter().filter(|item| item.is_ad()).count(), 1);
    }

    #[test]
    fn test_interleave_edge_cases() {
        assert!(interleave_ads(Vec::new(), &[ad("a1", 1)], 5).unwrap().is_empty());

        let short = interleave_ads((1..=4).map(post).collect(), &[ad("a1", 1)], 5).unwrap();
        assert!(short.iter().all(|item| !item.is_ad()));

        let no_ads = interleave_ads((1..=10).map(post).collect(), &[], 5).unwrap();
        assert_eq!(no_ads.len(), 10);

        let err = interleave_ads((1..=3).map(post).collect(), &[], 0).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn test_feed_item_serializes_with_kind() {
        let value = serde_json::to_value(FeedItem::Ad(ad("a1", 1))).unwrap();
        assert_eq!(value["kind"], "ad");
        assert_eq!(value["title"], "Ad a1");

        let value = serde_json::to_value(FeedItem::Post(post(1))).unwrap();
        assert_eq!(value["kind"], "post");
        assert_eq!(value["authorId"], "u1");
    }

    fn session_for(store: &DocumentStore) -> Session {
        Session::new(store.clone(), Identity::new("u1", "u1@example.com", None)).unwrap()
    }

    #[tokio::test]
    async fn test_eligible_ads_filter_and_order() {
        let (store, _dir) = test_store().await;
        let session = session_for(&store);

        store.write("ads/late", &ad("late", 20)).await.unwrap();
        store.write("ads/early", &ad("early", 10)).await.unwrap();
        store
            .write("ads/off", &json!({"title": "off", "targetUrl": "https://x.com", "active": false, "createdAt": 1}))
            .await
            .unwrap();
        store
            .write("ads/banner", &json!({"title": "b", "targetUrl": "https://x.com", "format": "banner", "createdAt": 1}))
            .await
            .unwrap();

        let ids: Vec<String> = eligible_ads(&session, "card", "middle")
            .await
            .unwrap()
            .into_iter()
            .map(|a| a.id)
            .collect();
        assert_eq!(ids, vec!["early", "late"]);
    }

    #[tokio::test]
    async fn test_assemble_feed_end_to_end() {
        let (store, _dir) = test_store().await;
        let session = session_for(&store);

        for n in 1..=6 {
            store.write(&paths::post(&format!("p{n}")), &post(n)).await.unwrap();
        }
        let created = create_ad(
            &session,
            CreateAdRequest {
                title: "Sponsored".into(),
                body: "Buy".into(),
                image_url: None,
                target_url: "https://shop.example.com".into(),
                format: default_format(),
                placement: default_placement(),
                active: true,
            },
        )
        .await
        .unwrap();

        let feed = assemble_feed(&session, 50, 5).await.unwrap();
        assert_eq!(feed.len(), 7);
        assert_eq!(feed[5], FeedItem::Ad(created));
        assert_eq!(shape(&feed)[..5], ["p1", "p2", "p3", "p4", "p5"]);

        let err = assemble_feed(&session, 50, 0).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_create_ad_rejects_bad_target() {
        let (store, _dir) = test_store().await;
        let session = session_for(&store);

        let err = create_ad(
            &session,
            CreateAdRequest {
                title: "x".into(),
                body: String::new(),
                image_url: None,
                target_url: "ftp://nope".into(),
                format: default_format(),
                placement: default_placement(),
                active: true,
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }
}

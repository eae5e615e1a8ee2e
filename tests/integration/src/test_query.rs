//! PartiQL queries against a live endpoint.

#[cfg(test)]
mod tests {
    use dynorm_core::{Dynorm, DynormError};
    use serde_json::json;

    use crate::{cleanup, cookbook_db};

    async fn seed(db: &Dynorm) {
        for (title, author) in [
            ("Southern Savories", "dev@studiowebfx.com"),
            ("Southern Smothered", "toby@example.com"),
            ("Bay Breeze", "amy@example.com"),
        ] {
            db.model_with(
                "CookbookModel",
                [("title", title), ("author", author), ("summary", "seeded")],
            )
            .unwrap()
            .save()
            .await
            .unwrap();
        }
    }

    #[tokio::test]
    #[ignore = "requires running DynamoDB endpoint"]
    async fn test_should_select_with_conditions() {
        let db = cookbook_db("query").await.unwrap();
        seed(&db).await;

        let both = db
            .query("CookbookTable")
            .unwrap()
            .where_("title", "=", "Bay Breeze")
            .unwrap()
            .and("author", "=", "amy@example.com")
            .unwrap()
            .get()
            .await
            .unwrap();
        assert_eq!(both.len(), 1);

        let either = db
            .query("CookbookTable")
            .unwrap()
            .where_("title", "=", "Bay Breeze")
            .unwrap()
            .or("title", "=", "Southern Smothered")
            .unwrap()
            .get()
            .await
            .unwrap();
        assert_eq!(either.len(), 2);

        let first = db
            .query("CookbookTable")
            .unwrap()
            .select(["title", "author"])
            .unwrap()
            .where_("title", "=", "Southern Savories")
            .unwrap()
            .first()
            .await
            .unwrap()
            .unwrap();
        assert_eq!(first.get("author").unwrap(), Some(&json!("dev@studiowebfx.com")));

        cleanup(&db).await;
    }

    #[tokio::test]
    #[ignore = "requires running DynamoDB endpoint"]
    async fn test_should_delete_through_query() {
        let db = cookbook_db("qdelete").await.unwrap();
        seed(&db).await;

        let partial = db
            .query("CookbookTable")
            .unwrap()
            .where_("title", "=", "Bay Breeze")
            .unwrap();
        assert!(matches!(partial.delete().await.unwrap_err(), DynormError::Query(_)));

        let full = partial.and("author", "=", "amy@example.com").unwrap();
        assert!(full.delete().await.unwrap());

        cleanup(&db).await;
    }
}

//! Model persistence against a live endpoint.

#[cfg(test)]
mod tests {
    use dynorm_core::{DynormError, KeyValues};
    use serde_json::json;

    use crate::{cleanup, cookbook_db};

    #[tokio::test]
    #[ignore = "requires running DynamoDB endpoint"]
    async fn test_should_save_find_update_and_delete() {
        let db = cookbook_db("model").await.unwrap();
        let mut model = db
            .model_with(
                "CookbookModel",
                [
                    ("title", json!("X")),
                    ("author", json!("Y")),
                    ("summary", json!("Everything X")),
                    ("image", json!(["i.png"])),
                ],
            )
            .unwrap();
        model.save().await.unwrap();

        let found = model
            .find_by(KeyValues::new("X").with_sort_key("Y"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.get("title").unwrap(), Some(&json!("X")));
        assert_eq!(found.get("author").unwrap(), Some(&json!("Y")));
        assert_eq!(found.get("reviews").unwrap(), Some(&json!(0)));

        model.set("reviews", 3);
        model.update().await.unwrap();
        assert_eq!(model.get("reviews").unwrap(), Some(&json!(3)));

        assert!(model.delete().await.unwrap());
        assert!(model.find().await.unwrap().is_none());

        cleanup(&db).await;
    }

    #[tokio::test]
    #[ignore = "requires running DynamoDB endpoint"]
    async fn test_should_report_missing_table_on_save() {
        let db = cookbook_db("missing").await.unwrap();
        cleanup(&db).await;

        let model = db
            .model_with(
                "CookbookModel",
                [("title", "X"), ("author", "Y"), ("summary", "gone")],
            )
            .unwrap();
        let err = model.save().await.unwrap_err();
        assert!(matches!(err, DynormError::TableNotFound(_)));
    }
}

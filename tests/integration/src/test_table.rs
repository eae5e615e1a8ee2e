//! Table lifecycle against a live endpoint.

#[cfg(test)]
mod tests {
    use dynorm_core::{DynormError, ExistenceOption};

    use crate::{cleanup, cookbook_db};

    #[tokio::test]
    #[ignore = "requires running DynamoDB endpoint"]
    async fn test_should_create_describe_and_delete_table() {
        let db = cookbook_db("table").await.unwrap();
        let table = db.table("CookbookTable").unwrap();
        let name = table.schema().name().to_owned();

        let description = table.describe().await.unwrap().unwrap();
        assert_eq!(description.table_name.as_deref(), Some(name.as_str()));
        assert_eq!(description.key_schema.len(), 2);

        assert!(table.delete().await.unwrap().is_some());
        assert!(table.describe().await.unwrap().is_none());
    }

    #[tokio::test]
    #[ignore = "requires running DynamoDB endpoint"]
    async fn test_should_refuse_to_create_existing_table() {
        let db = cookbook_db("exists").await.unwrap();

        let err = db.create_tables(ExistenceOption::None).await.unwrap_err();
        assert!(matches!(err, DynormError::CreateTable(_)));
        assert!(db.create_tables(ExistenceOption::IfNotExists).await.is_ok());

        cleanup(&db).await;
    }
}

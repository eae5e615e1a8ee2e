//! Store operations the mapping layer issues.

use std::fmt;

/// Every store operation a [`DynamoDBClient`](crate::client::DynamoDBClient)
/// implements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DynamoDBOperation {
    // Table management
    /// Create a new table.
    CreateTable,
    /// Delete a table.
    DeleteTable,
    /// Describe a table.
    DescribeTable,

    // Item CRUD
    /// Put (insert or replace) an item.
    PutItem,
    /// Get an item by primary key.
    GetItem,
    /// Update an item in place.
    UpdateItem,
    /// Delete an item by primary key.
    DeleteItem,

    // PartiQL
    /// Execute a PartiQL statement.
    ExecuteStatement,
}

impl DynamoDBOperation {
    /// Returns the AWS operation name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CreateTable => "CreateTable",
            Self::DeleteTable => "DeleteTable",
            Self::DescribeTable => "DescribeTable",
            Self::PutItem => "PutItem",
            Self::GetItem => "GetItem",
            Self::UpdateItem => "UpdateItem",
            Self::DeleteItem => "DeleteItem",
            Self::ExecuteStatement => "ExecuteStatement",
        }
    }

    /// Parse an operation from its AWS name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "CreateTable" => Some(Self::CreateTable),
            "DeleteTable" => Some(Self::DeleteTable),
            "DescribeTable" => Some(Self::DescribeTable),
            "PutItem" => Some(Self::PutItem),
            "GetItem" => Some(Self::GetItem),
            "UpdateItem" => Some(Self::UpdateItem),
            "DeleteItem" => Some(Self::DeleteItem),
            "ExecuteStatement" => Some(Self::ExecuteStatement),
            _ => None,
        }
    }

    /// Returns `true` for control-plane (table lifecycle) operations.
    #[must_use]
    pub fn is_control_plane(&self) -> bool {
        matches!(
            self,
            Self::CreateTable | Self::DeleteTable | Self::DescribeTable
        )
    }
}

impl fmt::Display for DynamoDBOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

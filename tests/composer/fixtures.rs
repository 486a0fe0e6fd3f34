use scribe_stack::{
    resources::{
        BucketDeclaration, IdentityPoolDeclaration, KeyAttribute, PoolClient, ProjectionMode,
        ResourceRegistry, SecondaryIndex, TableDeclaration,
    },
    types::StackEnvironment,
};

pub fn environment() -> StackEnvironment {
    StackEnvironment::new("data-scribe", "123456789012", "us-east-1")
}

pub fn registry() -> ResourceRegistry {
    ResourceRegistry::new(environment())
}

pub fn report_table() -> TableDeclaration {
    TableDeclaration::new("ReportTable", "ReportID")
}

pub fn owner_index(name: &str) -> SecondaryIndex {
    SecondaryIndex {
        index_name: name.to_string(),
        partition_key: KeyAttribute::string("OwnerID"),
        sort_key: None,
        projection: ProjectionMode::KeysOnly,
    }
}

pub fn csv_bucket() -> BucketDeclaration {
    let mut bucket = BucketDeclaration::new("CsvBucket");
    bucket.physical_name = Some("scribe-csv-bucket".to_string());
    bucket
}

pub fn user_pool() -> IdentityPoolDeclaration {
    let mut pool = IdentityPoolDeclaration::new("UserPool");
    pool.policy.self_sign_up = true;
    pool.policy.clients.push(PoolClient {
        name: "DataScribeClient".to_string(),
        generate_secret: false,
        auth_flows: Vec::new(),
    });
    pool
}

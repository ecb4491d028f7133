pub mod types;
pub mod error;
pub mod config;
pub mod templates;
pub mod identity;
pub mod store;
pub mod storage;
pub mod session;
pub mod clients;
pub mod sites;
pub mod images;
pub mod render;

pub use error::{Error, ErrorCode, Result, VendorError};
pub use session::{SessionProvider, SessionState};

use aws_sdk_cognitoidentityprovider::Client as CognitoClient;
use aws_sdk_dynamodb::Client as DynamoClient;
use aws_sdk_s3::Client as S3Client;
use config::Config;
use identity::CognitoIdentity;
use storage::S3Storage;
use store::DynamoStore;

/// AWS-backed services behind the identity, document and object seams
pub struct AwsBackends {
    pub identity: CognitoIdentity,
    pub store: DynamoStore,
    pub storage: S3Storage,
}

impl AwsBackends {
    /// Build all AWS clients once from the ambient AWS configuration.
    pub async fn load(config: &Config) -> Self {
        let aws_config = aws_config::load_from_env().await;

        tracing::info!(
            "AWS backends: table {} / bucket {}",
            config.table_name,
            config.assets.bucket
        );

        Self {
            identity: CognitoIdentity::new(CognitoClient::new(&aws_config), config.cognito.clone()),
            store: DynamoStore::new(DynamoClient::new(&aws_config), config.table_name.clone()),
            storage: S3Storage::new(S3Client::new(&aws_config), config.assets.bucket.clone()),
        }
    }

    /// Start a session on the Cognito/DynamoDB pair.
    pub async fn session(self, config: &Config) -> (SessionProvider<CognitoIdentity, DynamoStore>, S3Storage) {
        let session =
            SessionProvider::initialize(self.identity, self.store, config.session.clone()).await;
        (session, self.storage)
    }
}

pub mod metadata_provider;
pub mod salesforce;

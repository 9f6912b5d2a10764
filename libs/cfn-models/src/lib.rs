//! CloudFormation custom resource models shared by the deployer

pub mod models;

pub use models::{
    CustomResourceRequest, CustomResourceResponse, RequestType, ResponseData, ResponseStatus,
};

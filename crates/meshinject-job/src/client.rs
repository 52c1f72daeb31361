//! Cluster access used by the watcher

use async_trait::async_trait;
use k8s_openapi::api::batch::v1::Job;
use kube::api::{Api, DeleteParams};
use kube::Client;
#[cfg(test)]
use mockall::automock;
use tracing::debug;

use meshinject_common::kube_utils::is_not_found;
use meshinject_common::Error;

/// Trait abstracting Job operations
///
/// This trait allows mocking the Kubernetes client in tests while using
/// the real client in production.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait JobClient: Send + Sync {
    /// Get a Job, `None` if it does not exist
    async fn get_job(&self, namespace: &str, name: &str) -> Result<Option<Job>, Error>;

    /// Delete a Job and its pods
    ///
    /// Deleting a Job that is already gone succeeds.
    async fn delete_job(&self, namespace: &str, name: &str) -> Result<(), Error>;
}

/// Real Kubernetes implementation of [`JobClient`]
#[derive(Clone)]
pub struct KubeJobClient {
    client: Client,
}

impl KubeJobClient {
    /// Wrap a kube client
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl JobClient for KubeJobClient {
    async fn get_job(&self, namespace: &str, name: &str) -> Result<Option<Job>, Error> {
        let api: Api<Job> = Api::namespaced(self.client.clone(), namespace);
        match api.get(name).await {
            Ok(job) => Ok(Some(job)),
            Err(e) if is_not_found(&e) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn delete_job(&self, namespace: &str, name: &str) -> Result<(), Error> {
        let api: Api<Job> = Api::namespaced(self.client.clone(), namespace);
        // Background propagation so the Job's pods go with it
        match api.delete(name, &DeleteParams::background()).await {
            Ok(_) => Ok(()),
            Err(e) if is_not_found(&e) => {
                debug!(namespace = %namespace, job = %name, "job already deleted");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Kubernetes job adapter — runs each step as a `batch/v1` Job.
//!
//! # Architecture
//!
//! One step submission becomes one Kubernetes Job with a single pod and
//! `restartPolicy: Never`; the step's container image and command map
//! directly onto the Job's pod template. [`watch`](KubernetesJobAdapter::watch)
//! polls the Job's status block rather than the pod directly, since a
//! Job's `succeeded`/`failed`/`active` counters already normalize across
//! pod retries and backoff.

use crate::adapter::{JobAdapter, JobAdapterError, JobHandle, JobSubmission};
use async_trait::async_trait;
use flowline_core::{JobId, JobStatus};
use k8s_openapi::api::batch::v1::{Job, JobSpec};
use k8s_openapi::api::core::v1::{Container, EnvVar, Pod, PodSpec, PodTemplateSpec};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::api::{Api, DeleteParams, PostParams};
use kube::Client;
use rand::Rng;
use std::time::Duration;
use tokio::sync::mpsc;

#[derive(Clone)]
pub struct KubernetesJobAdapter {
    client: Client,
    namespace: String,
    poll_base_ms: u64,
}

impl KubernetesJobAdapter {
    /// `poll_base_ms` is the watch loop's base polling interval; each
    /// poll adds up to 25% jitter on top so many steps' watch loops
    /// don't all hit the API server in lockstep.
    pub async fn connect(namespace: impl Into<String>, poll_base_ms: u64) -> Result<Self, JobAdapterError> {
        let client = Client::try_default()
            .await
            .map_err(|e| JobAdapterError::BackendUnavailable(format!("failed to create kube client: {e}")))?;
        Ok(Self { client, namespace: namespace.into(), poll_base_ms })
    }

    fn jobs_api(&self) -> Api<Job> {
        Api::namespaced(self.client.clone(), &self.namespace)
    }

    fn poll_interval(&self) -> Duration {
        let jitter_ms: u64 = rand::thread_rng().gen_range(0..=self.poll_base_ms / 4 + 1);
        Duration::from_millis(self.poll_base_ms + jitter_ms)
    }

    fn build_job(submission: &JobSubmission, namespace: &str) -> Job {
        let job_name = format!("flowline-{}", submission.job_id);
        let env: Vec<EnvVar> = submission
            .env
            .iter()
            .map(|(k, v)| EnvVar { name: k.clone(), value: Some(v.clone()), ..Default::default() })
            .collect();

        Job {
            metadata: ObjectMeta { name: Some(job_name.clone()), namespace: Some(namespace.to_string()), ..Default::default() },
            spec: Some(JobSpec {
                backoff_limit: Some(0),
                template: PodTemplateSpec {
                    metadata: Some(ObjectMeta { name: Some(job_name), ..Default::default() }),
                    spec: Some(PodSpec {
                        restart_policy: Some("Never".to_string()),
                        containers: vec![Container {
                            name: submission.step_name.clone(),
                            image: Some(submission.image.clone()),
                            command: Some(vec!["/bin/sh".to_string(), "-c".to_string(), submission.command.clone()]),
                            env: Some(env),
                            ..Default::default()
                        }],
                        ..Default::default()
                    }),
                },
                ..Default::default()
            }),
            ..Default::default()
        }
    }
}

#[async_trait]
impl JobAdapter for KubernetesJobAdapter {
    fn validate(&self, submission: &JobSubmission) -> Result<(), JobAdapterError> {
        if submission.image.trim().is_empty() {
            return Err(JobAdapterError::InvalidSubmission(format!("step[{}] has no image", submission.step_name)));
        }
        if submission.command.trim().is_empty() {
            return Err(JobAdapterError::InvalidSubmission(format!("step[{}] has no command", submission.step_name)));
        }
        Ok(())
    }

    async fn start(&self, submission: JobSubmission) -> Result<JobHandle, JobAdapterError> {
        self.validate(&submission)?;
        let job_spec = Self::build_job(&submission, &self.namespace);
        let backend_ref = job_spec.metadata.name.clone().unwrap_or_default();

        tracing::info!(job_id = %submission.job_id, step = %submission.step_name, backend_ref = %backend_ref, "submitting kubernetes job");

        self.jobs_api()
            .create(&PostParams::default(), &job_spec)
            .await
            .map_err(|e| JobAdapterError::StartFailed(format!("job creation failed: {e}")))?;

        Ok(JobHandle { job_id: submission.job_id, backend_ref })
    }

    async fn watch(&self, handle: &JobHandle, events: mpsc::Sender<JobStatus>) -> Result<(), JobAdapterError> {
        let api = self.jobs_api();
        let mut last_status = None;

        loop {
            let job = api.get(&handle.backend_ref).await.map_err(|_| JobAdapterError::WatchFailed(handle.job_id))?;
            let status = job.status.as_ref();
            let current = JobStatus::from_batch_job_counts(
                status.and_then(|s| s.active).unwrap_or(0),
                status.and_then(|s| s.succeeded).unwrap_or(0),
                status.and_then(|s| s.failed).unwrap_or(0),
            );

            if last_status != Some(current) {
                if events.send(current).await.is_err() {
                    return Ok(());
                }
                last_status = Some(current);
            }

            if current.is_ended() {
                return Ok(());
            }

            tokio::time::sleep(self.poll_interval()).await;
        }
    }

    async fn stop(&self, handle: &JobHandle) -> Result<(), JobAdapterError> {
        tracing::info!(job_id = %handle.job_id, backend_ref = %handle.backend_ref, "deleting kubernetes job");
        self.jobs_api()
            .delete(&handle.backend_ref, &DeleteParams::background())
            .await
            .map_err(|e| JobAdapterError::StopFailed(handle.job_id, e.to_string()))?;
        Ok(())
    }

    fn supports_reattach(&self) -> bool {
        true
    }

    fn reattach(&self, job_id: JobId, _step_name: &str) -> JobHandle {
        JobHandle { job_id, backend_ref: format!("flowline-{job_id}") }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flowline_core::JobId;
    use std::collections::BTreeMap;

    #[test]
    fn build_job_maps_submission_fields() {
        let mut env = BTreeMap::new();
        env.insert("FOO".to_string(), "bar".to_string());
        let submission =
            JobSubmission { job_id: JobId::new(), step_name: "train".to_string(), image: "img:latest".to_string(), command: "run.sh".to_string(), env };
        let job = KubernetesJobAdapter::build_job(&submission, "ns");
        let pod_spec = job.spec.unwrap().template.spec.unwrap();
        assert_eq!(pod_spec.restart_policy.as_deref(), Some("Never"));
        assert_eq!(pod_spec.containers[0].image.as_deref(), Some("img:latest"));
    }
}

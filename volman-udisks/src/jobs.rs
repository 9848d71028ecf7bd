//! Live map of backend jobs to the devices they run against
//!
//! UDisks2 announces long-running operations as separate `Job` objects
//! whose `Objects` property lists the affected devices. The table is
//! primed from the initial enumeration and maintained from ObjectManager
//! signals; a device is busy while any job references it.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use zbus::zvariant::{OwnedObjectPath, OwnedValue};

use crate::proxy::InterfaceProperties;

pub(crate) const JOB_IFACE: &str = "org.freedesktop.UDisks2.Job";

#[derive(Clone, Default)]
pub(crate) struct JobTable {
    inner: Arc<Mutex<HashMap<OwnedObjectPath, Vec<String>>>>,
}

impl JobTable {
    pub(crate) fn from_managed(
        objects: &HashMap<OwnedObjectPath, InterfaceProperties>,
    ) -> Self {
        let table = Self::default();
        for (path, interfaces) in objects {
            if let Some(props) = interfaces.get(JOB_IFACE) {
                table.insert(path.clone(), job_targets(props));
            }
        }
        table
    }

    /// Record a job and return its targets.
    pub(crate) fn insert(&self, job: OwnedObjectPath, targets: Vec<String>) -> Vec<String> {
        self.inner.lock().unwrap().insert(job, targets.clone());
        targets
    }

    /// Forget a job and return the targets it used to reference.
    pub(crate) fn remove(&self, job: &OwnedObjectPath) -> Vec<String> {
        self.inner.lock().unwrap().remove(job).unwrap_or_default()
    }

    pub(crate) fn is_busy(&self, id: &str) -> bool {
        self.inner
            .lock()
            .unwrap()
            .values()
            .any(|targets| targets.iter().any(|target| target == id))
    }
}

/// Pull the target object paths out of a Job interface property bag.
/// A malformed or missing `Objects` value means no targets.
pub(crate) fn job_targets(props: &HashMap<String, OwnedValue>) -> Vec<String> {
    let Some(value) = props.get("Objects") else {
        return Vec::new();
    };

    match <Vec<OwnedObjectPath>>::try_from(value.clone()) {
        Ok(paths) => paths.iter().map(|path| path.to_string()).collect(),
        Err(_) => Vec::new(),
    }
}

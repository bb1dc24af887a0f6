use super::{EPerson, Group, ObjectCore, Related, RelatedMany};
use chrono::{DateTime, Utc};
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct Item {
    pub core: ObjectCore,
    pub name: String,
    pub in_archive: bool,
    pub withdrawn: bool,
    pub last_modified: DateTime<Utc>,
    pub submitter: Related<EPerson>,
    pub bundles: RelatedMany<Bundle>,
}

impl Item {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            core: ObjectCore::new(),
            name: name.into(),
            in_archive: false,
            withdrawn: false,
            last_modified: Utc::now(),
            submitter: Related::absent(),
            bundles: RelatedMany::empty(),
        }
    }

    pub fn with_submitter(mut self, submitter: Arc<EPerson>) -> Self {
        self.submitter = Related::loaded(submitter);
        self
    }

    pub fn with_bundles(mut self, bundles: Vec<Arc<Bundle>>) -> Self {
        self.bundles = RelatedMany::loaded(bundles);
        self
    }

    pub fn archived(mut self) -> Self {
        self.in_archive = true;
        self
    }

    pub fn unloaded(&self) -> Self {
        Self {
            core: self.core.unloaded(),
            name: self.name.clone(),
            in_archive: self.in_archive,
            withdrawn: self.withdrawn,
            last_modified: self.last_modified,
            submitter: self.submitter.unload(),
            bundles: self.bundles.unload(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Bundle {
    pub core: ObjectCore,
    pub name: String,
    pub bitstreams: RelatedMany<Bitstream>,
}

impl Bundle {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            core: ObjectCore::new(),
            name: name.into(),
            bitstreams: RelatedMany::empty(),
        }
    }

    pub fn with_bitstreams(mut self, bitstreams: Vec<Arc<Bitstream>>) -> Self {
        self.bitstreams = RelatedMany::loaded(bitstreams);
        self
    }

    pub fn unloaded(&self) -> Self {
        Self {
            core: self.core.unloaded(),
            name: self.name.clone(),
            bitstreams: self.bitstreams.unload(),
        }
    }
}

/// Descriptor of stored binary content. Owns no further entities.
#[derive(Debug, Clone)]
pub struct Bitstream {
    pub core: ObjectCore,
    pub name: String,
    pub size_bytes: u64,
    pub checksum: Option<String>,
}

impl Bitstream {
    pub fn new(name: impl Into<String>, size_bytes: u64) -> Self {
        Self {
            core: ObjectCore::new(),
            name: name.into(),
            size_bytes,
            checksum: None,
        }
    }

    pub fn with_checksum(mut self, checksum: impl Into<String>) -> Self {
        self.checksum = Some(checksum.into());
        self
    }

    pub fn unloaded(&self) -> Self {
        Self {
            core: self.core.unloaded(),
            name: self.name.clone(),
            size_bytes: self.size_bytes,
            checksum: self.checksum.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Community {
    pub core: ObjectCore,
    pub name: String,
    pub administrators: Related<Group>,
    pub logo: Related<Bitstream>,
}

impl Community {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            core: ObjectCore::new(),
            name: name.into(),
            administrators: Related::absent(),
            logo: Related::absent(),
        }
    }

    pub fn with_administrators(mut self, group: Arc<Group>) -> Self {
        self.administrators = Related::loaded(group);
        self
    }

    pub fn with_logo(mut self, logo: Arc<Bitstream>) -> Self {
        self.logo = Related::loaded(logo);
        self
    }

    pub fn unloaded(&self) -> Self {
        Self {
            core: self.core.unloaded(),
            name: self.name.clone(),
            administrators: self.administrators.unload(),
            logo: self.logo.unload(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Collection {
    pub core: ObjectCore,
    pub name: String,
    pub logo: Related<Bitstream>,
    pub administrators: Related<Group>,
    pub submitters: Related<Group>,
    pub template_item: Related<Item>,
    pub workflow_step_1: Related<Group>,
    pub workflow_step_2: Related<Group>,
    pub workflow_step_3: Related<Group>,
}

impl Collection {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            core: ObjectCore::new(),
            name: name.into(),
            logo: Related::absent(),
            administrators: Related::absent(),
            submitters: Related::absent(),
            template_item: Related::absent(),
            workflow_step_1: Related::absent(),
            workflow_step_2: Related::absent(),
            workflow_step_3: Related::absent(),
        }
    }

    pub fn with_logo(mut self, logo: Arc<Bitstream>) -> Self {
        self.logo = Related::loaded(logo);
        self
    }

    pub fn with_administrators(mut self, group: Arc<Group>) -> Self {
        self.administrators = Related::loaded(group);
        self
    }

    pub fn with_submitters(mut self, group: Arc<Group>) -> Self {
        self.submitters = Related::loaded(group);
        self
    }

    pub fn with_template_item(mut self, item: Arc<Item>) -> Self {
        self.template_item = Related::loaded(item);
        self
    }

    /// Set workflow step `step` (1-based). Steps outside 1..=3 are ignored.
    pub fn with_workflow_step(mut self, step: usize, group: Arc<Group>) -> Self {
        let slot = match step {
            1 => &mut self.workflow_step_1,
            2 => &mut self.workflow_step_2,
            3 => &mut self.workflow_step_3,
            _ => return self,
        };
        *slot = Related::loaded(group);
        self
    }

    pub fn workflow_steps(&self) -> [&Related<Group>; 3] {
        [
            &self.workflow_step_1,
            &self.workflow_step_2,
            &self.workflow_step_3,
        ]
    }

    pub fn unloaded(&self) -> Self {
        Self {
            core: self.core.unloaded(),
            name: self.name.clone(),
            logo: self.logo.unload(),
            administrators: self.administrators.unload(),
            submitters: self.submitters.unload(),
            template_item: self.template_item.unload(),
            workflow_step_1: self.workflow_step_1.unload(),
            workflow_step_2: self.workflow_step_2.unload(),
            workflow_step_3: self.workflow_step_3.unload(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_item_unloaded_drops_materialized_graph() {
        let bundle = Arc::new(Bundle::new("ORIGINAL"));
        let submitter = Arc::new(EPerson::new("alice@example.org"));
        let submitter_id = submitter.core.id;
        let item = Item::new("Thesis")
            .with_submitter(submitter)
            .with_bundles(vec![bundle]);

        let stored = item.unloaded();
        assert_eq!(stored.core.id, item.core.id);
        assert!(!stored.bundles.is_initialized());
        assert!(!stored.submitter.is_initialized());
        assert_eq!(stored.submitter.target_id(), Some(submitter_id));
    }

    #[test]
    fn test_workflow_steps_are_independent() {
        let reviewers = Arc::new(Group::new("reviewers"));
        let collection = Collection::new("Theses").with_workflow_step(2, reviewers);

        let steps = collection.workflow_steps();
        assert!(steps[0].is_absent());
        assert!(steps[1].get().is_some());
        assert!(steps[2].is_absent());
    }

    #[test]
    fn test_out_of_range_workflow_step_is_ignored() {
        let group = Arc::new(Group::new("nobody"));
        let collection = Collection::new("Theses").with_workflow_step(4, group);
        assert!(collection.workflow_steps().iter().all(|step| step.is_absent()));
    }
}

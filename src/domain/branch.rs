use crate::error::{BatchPushError, Result};

/// Include/exclude filter applied to the local branch list
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BranchFilter {
    pub include: Vec<String>,
    pub exclude: Vec<String>,
}

impl BranchFilter {
    pub fn new(include: Vec<String>, exclude: Vec<String>) -> Self {
        BranchFilter { include, exclude }
    }

    /// Select branches to publish, in lexicographic order.
    ///
    /// An empty `include` keeps every local branch. Naming a branch in
    /// `include` that does not exist locally is an error.
    pub fn select(&self, local: &[String]) -> Result<Vec<String>> {
        let mut selected: Vec<String> = if self.include.is_empty() {
            local.to_vec()
        } else {
            for wanted in &self.include {
                if !local.contains(wanted) {
                    return Err(BatchPushError::branch(format!(
                        "Branch not found: {}",
                        wanted
                    )));
                }
            }
            self.include.clone()
        };

        selected.retain(|b| !self.exclude.contains(b));
        selected.sort();
        selected.dedup();
        Ok(selected)
    }
}

//! Addressing scheme for positions within a run's object tree.
//!
//! A run walks either a routine's subroutine tree or a project's directory
//! tree. A [`Location`] names one position in that tree; a [`LocationStack`]
//! records the descent from the root. The run loader resolves locations to
//! [`VersionObject`]s pulled from the backing store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Which object family a location addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocationKind {
    Routine,
    Project,
}

/// One position within a routine's subroutine tree or a project's
/// directory tree.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Location {
    pub kind: LocationKind,
    /// Id of the version object at this position.
    pub object_id: Uuid,
    /// The subroutine (or subdirectory) descended into, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subroutine_id: Option<Uuid>,
}

impl Location {
    pub fn routine(object_id: Uuid) -> Self {
        Self {
            kind: LocationKind::Routine,
            object_id,
            subroutine_id: None,
        }
    }

    pub fn project(object_id: Uuid) -> Self {
        Self {
            kind: LocationKind::Project,
            object_id,
            subroutine_id: None,
        }
    }

    pub fn with_subroutine(mut self, subroutine_id: Uuid) -> Self {
        self.subroutine_id = Some(subroutine_id);
        self
    }
}

/// Ordered descent into nested subroutines/directories, root first.
pub type LocationStack = Vec<Location>;

/// A resolved hierarchical version record.
///
/// `payload` carries the graph/config blob; it dominates the serialized
/// size and therefore the cache byte accounting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionObject {
    /// Id of this specific version.
    pub id: Uuid,
    /// Id of the versionless root object.
    pub root_id: Uuid,
    pub kind: LocationKind,
    pub name: String,
    /// Semantic version label (e.g. "1.2.0").
    pub version_label: String,
    /// Relative execution cost estimate for this subtree.
    pub complexity: u64,
    /// Ids of child subroutines or subdirectories.
    #[serde(default)]
    pub children: Vec<Uuid>,
    /// Graph/config payload as stored.
    pub payload: serde_json::Value,
    pub updated_at: DateTime<Utc>,
}

/// The resolved objects for one location: the addressed object and, when
/// the location names one, the subroutine descended into.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationData {
    pub object: VersionObject,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subroutine: Option<VersionObject>,
}

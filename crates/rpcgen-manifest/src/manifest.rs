use std::fmt;
use std::path::Path;

use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};

use crate::mask::{PermissionMask, MAX_PERMISSIONS};

/// Manifest index of the permission that bypasses every per-method check.
pub const BYPASS_INDEX: usize = 1;

/// Prefix of the generated permission index constants.
pub const CONSTANT_PREFIX: &str = "RPC_PERMISSION_";

/// A declared permission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permission {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

impl Permission {
    /// The generated index constant for this permission.
    pub fn constant_name(&self) -> String {
        constant_name(&self.name)
    }
}

/// A role as written in the manifest file.
#[derive(Debug, Deserialize)]
struct RawRole {
    name: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    permissions: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RawManifest {
    #[serde(default)]
    permissions: Vec<Permission>,
    #[serde(default)]
    roles: Vec<RawRole>,
}

/// A named set of permissions, resolved to manifest indices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Role {
    pub name: String,
    pub description: String,
    /// Indices into [`Manifest::permissions`], in the order the role lists them.
    pub permissions: Vec<usize>,
}

impl Role {
    pub fn mask(&self) -> PermissionMask {
        PermissionMask::from_indices(self.permissions.iter().copied())
    }
}

/// A validated permission/role manifest.
///
/// Permission order is significant: a permission's position is its bit index
/// in every generated mask and its 1-based position is its SQL row id.
#[derive(Debug, Clone)]
pub struct Manifest {
    pub permissions: Vec<Permission>,
    pub roles: Vec<Role>,
    index: FxHashMap<String, usize>,
}

/// Why a manifest could not be loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManifestError {
    Io { path: String, message: String },
    Json(String),
    InvalidName { name: String },
    DuplicatePermission { name: String },
    DuplicateRole { name: String },
    UnknownRolePermission { role: String, permission: String },
    DuplicateRolePermission { role: String, permission: String },
    ConstantCollision { first: String, second: String, constant: String },
    TooManyPermissions { count: usize },
}

impl fmt::Display for ManifestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io { path, message } => write!(f, "failed to read manifest {path}: {message}"),
            Self::Json(msg) => write!(f, "failed to parse manifest: {msg}"),
            Self::InvalidName { name } => write!(f, "invalid permission or role name {name:?}"),
            Self::DuplicatePermission { name } => {
                write!(f, "permission `{name}` is declared more than once")
            }
            Self::DuplicateRole { name } => write!(f, "role `{name}` is declared more than once"),
            Self::UnknownRolePermission { role, permission } => write!(
                f,
                "role `{role}` references undeclared permission `{permission}`"
            ),
            Self::DuplicateRolePermission { role, permission } => {
                write!(f, "role `{role}` lists permission `{permission}` twice")
            }
            Self::ConstantCollision {
                first,
                second,
                constant,
            } => write!(
                f,
                "permissions `{first}` and `{second}` both map to constant {constant}"
            ),
            Self::TooManyPermissions { count } => write!(
                f,
                "{count} permissions declared, at most {MAX_PERMISSIONS} fit a permission mask"
            ),
        }
    }
}

impl std::error::Error for ManifestError {}

impl Manifest {
    /// Read and validate a JSON manifest from a file path.
    pub fn from_file(path: &Path) -> Result<Manifest, ManifestError> {
        let content = std::fs::read_to_string(path).map_err(|e| ManifestError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::from_str(&content)
    }

    /// Parse and validate a JSON manifest.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Manifest, ManifestError> {
        let raw: RawManifest =
            serde_json::from_str(content).map_err(|e| ManifestError::Json(e.to_string()))?;
        Self::validate(raw)
    }

    fn validate(raw: RawManifest) -> Result<Manifest, ManifestError> {
        if raw.permissions.len() > MAX_PERMISSIONS {
            return Err(ManifestError::TooManyPermissions {
                count: raw.permissions.len(),
            });
        }

        let mut index = FxHashMap::default();
        let mut constants: FxHashMap<String, &str> = FxHashMap::default();
        for (i, perm) in raw.permissions.iter().enumerate() {
            if !is_valid_name(&perm.name) {
                return Err(ManifestError::InvalidName {
                    name: perm.name.clone(),
                });
            }
            if index.insert(perm.name.clone(), i).is_some() {
                return Err(ManifestError::DuplicatePermission {
                    name: perm.name.clone(),
                });
            }
            let constant = perm.constant_name();
            if let Some(first) = constants.insert(constant.clone(), &perm.name) {
                return Err(ManifestError::ConstantCollision {
                    first: first.to_string(),
                    second: perm.name.clone(),
                    constant,
                });
            }
        }

        let mut role_names = FxHashSet::default();
        let mut roles = Vec::with_capacity(raw.roles.len());
        for raw_role in raw.roles {
            // Role names only ever appear inside escaped literals.
            if raw_role.name.is_empty() {
                return Err(ManifestError::InvalidName {
                    name: raw_role.name,
                });
            }
            if !role_names.insert(raw_role.name.clone()) {
                return Err(ManifestError::DuplicateRole {
                    name: raw_role.name,
                });
            }
            let mut held = Vec::with_capacity(raw_role.permissions.len());
            for perm in &raw_role.permissions {
                let Some(&i) = index.get(perm) else {
                    return Err(ManifestError::UnknownRolePermission {
                        role: raw_role.name.clone(),
                        permission: perm.clone(),
                    });
                };
                if held.contains(&i) {
                    return Err(ManifestError::DuplicateRolePermission {
                        role: raw_role.name.clone(),
                        permission: perm.clone(),
                    });
                }
                held.push(i);
            }
            roles.push(Role {
                name: raw_role.name,
                description: raw_role.description,
                permissions: held,
            });
        }

        Ok(Manifest {
            permissions: raw.permissions,
            roles,
            index,
        })
    }

    /// Manifest index of a permission name.
    pub fn permission_index(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    /// Combined mask of a list of permission names, or the first unknown name.
    pub fn mask_of<'a>(
        &self,
        names: impl IntoIterator<Item = &'a str>,
    ) -> Result<PermissionMask, &'a str> {
        let mut mask = PermissionMask::EMPTY;
        for name in names {
            let i = self.permission_index(name).ok_or(name)?;
            mask = mask.union(PermissionMask::bit(i));
        }
        Ok(mask)
    }

    /// The override permission, if the manifest declares one.
    pub fn bypass(&self) -> Option<&Permission> {
        self.permissions.get(BYPASS_INDEX)
    }
}

/// Upper-case a permission name into its generated constant.
///
/// `rdb.write-all` becomes `RPC_PERMISSION_RDB_WRITE_ALL`.
pub fn constant_name(name: &str) -> String {
    let body: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_uppercase()
            } else {
                '_'
            }
        })
        .collect();
    format!("{CONSTANT_PREFIX}{body}")
}

/// Names must survive the declaration grammar's comma-separated list and be
/// printable in generated sources.
fn is_valid_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.' | ':'))
}

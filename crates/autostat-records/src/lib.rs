//! Account, vehicle and fill-up record services
//!
//! Every read filters out soft-deleted rows. Deletes go through
//! [`SoftDeleteCascade`], which marks the entity and, in the same transaction,
//! every live descendant along the ownership chain.

pub mod services;

pub use services::*;

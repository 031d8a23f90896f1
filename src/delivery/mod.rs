//! Delivery of single objects into a local Maildir
//!
//! [`naming`] derives the filename, [`maildir`] owns the on-disk layout and
//! [`transfer`] streams one object in and removes it from the bucket.

pub mod maildir;
pub mod naming;
pub mod transfer;

pub use maildir::Maildir;
pub use naming::{HostIdentity, KEY_SEPARATOR, maildir_filename, message_name};
pub use transfer::{Transfer, TransferTask};

mod file;

pub use file::{
    FileChanges, FileFilter, FileLocation, FilePermission, FileRecord, FileType, NewFileRecord,
};

mod source;
mod store;

pub use source::{parse_csv_entries, EntrySource, FileSource, SheetSource, SourceBackend};
pub use store::EntryStore;

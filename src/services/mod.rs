pub mod archive;
pub mod archive_store;
pub mod batch;
pub mod error;
pub mod filename_allocator;
pub mod job;
pub mod networks;
pub mod sweeper;
pub mod template;
pub mod upload_resolver;
pub mod worker;

pub mod gemelnet_sync;

pub mod fake_elasticsearch;
pub mod scripted;

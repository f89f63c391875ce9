#[cfg(test)]
pub mod test_utils;
pub mod transcript_log;
pub mod url;

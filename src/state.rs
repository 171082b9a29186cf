use std::sync::{Arc, Mutex};

use rusqlite::Connection;

use crate::services::extraction::ExperienceExtractor;

pub struct AppState {
    pub db: Arc<Mutex<Connection>>,
    pub extractor: ExperienceExtractor,
}

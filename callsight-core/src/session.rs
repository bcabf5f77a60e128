//! Appending new sessions to the dataset.

use serde::{Deserialize, Serialize};

use crate::dataset::{Dataset, SessionRecord};
use crate::error::Result;

/// A session submitted from the dashboard, with raw category names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewSession {
    pub agent: String,
    pub topic: String,
    pub speed_of_answer: u32,
    /// Seconds, already numeric.
    pub avg_talk_duration: f64,
    pub satisfaction_rating: u8,
}

/// Encode `session` with the dataset's fitted encoders, append it to the
/// table and rewrite the backing file.
///
/// Fails with `UnseenCategory` before touching the table or file if the agent
/// or topic was not in the loaded data. The rating is not range-checked here.
pub fn append_session(dataset: &mut Dataset, session: &NewSession) -> Result<()> {
    let agent = dataset.agents.transform(&session.agent)?;
    let topic = dataset.topics.transform(&session.topic)?;

    dataset.table.push(SessionRecord {
        agent,
        topic,
        speed_of_answer: Some(session.speed_of_answer),
        avg_talk_duration: Some(session.avg_talk_duration),
        resolved: None,
        satisfaction_rating: session.satisfaction_rating,
        extra: Vec::new(),
    });
    dataset.save()?;

    tracing::info!(
        agent = %session.agent,
        topic = %session.topic,
        rating = session.satisfaction_rating,
        "Appended session; dataset now has {} rows",
        dataset.table.len()
    );
    Ok(())
}

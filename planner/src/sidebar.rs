//! Sidebar state that is independent of the DOM: upload sequencing, the RL
//! panel, monitoring stats and toast notifications.

use std::collections::VecDeque;

use shared::{
    CellId, Coordinate,
    api::{FeedbackKind, FeedbackRequest, RlAgentStats, RlFeedbackStats, RlRouteResponse, UploadResponse},
};
use tracing::debug;

use crate::{client::SmartRouteClient, error::PlannerError};

/// Pre-filled answer of the cell prompt.
pub const DEFAULT_CELL_ANSWER: &str = "0,0";
const NOTIFICATION_HISTORY: usize = 5;

/// Files are uploaded strictly one after another, in selection order.
#[derive(Debug)]
pub struct UploadQueue<T> {
    pending: VecDeque<T>,
    busy: bool,
}

impl<T> Default for UploadQueue<T> {
    fn default() -> Self {
        Self {
            pending: VecDeque::new(),
            busy: false,
        }
    }
}

impl<T> UploadQueue<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enqueue(&mut self, items: impl IntoIterator<Item = T>) {
        self.pending.extend(items);
    }

    /// Next item to process, or `None` while one is in flight.
    pub fn start_next(&mut self) -> Option<T> {
        if self.busy {
            return None;
        }
        let next = self.pending.pop_front()?;
        self.busy = true;
        Some(next)
    }

    /// Marks the in-flight item done, whatever its outcome.
    pub fn finish(&mut self) {
        self.busy = false;
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    pub fn remaining(&self) -> usize {
        self.pending.len()
    }
}

/// `None` answer means the prompt was cancelled and the file is skipped.
pub fn parse_cell_answer(answer: Option<&str>) -> Result<Option<CellId>, PlannerError> {
    answer
        .map(|raw| raw.parse::<CellId>().map_err(PlannerError::from))
        .transpose()
}

pub fn upload_summary(response: &UploadResponse) -> String {
    let prediction = response.prediction.map_or("Unknown", |label| label.as_str());
    match response.confidence {
        Some(confidence) => format!("Prediction: {prediction} ({:.1}% confidence)", confidence * 100.0),
        None => format!("Prediction: {prediction}"),
    }
}

/// Wire fractions (0-1) as a display percentage.
pub fn percent(fraction: f64) -> String {
    format!("{:.1}%", fraction * 100.0)
}

#[derive(Debug, Default)]
pub struct RlPanel {
    route: Option<RlRouteResponse>,
    loading: bool,
    sending_feedback: bool,
}

impl RlPanel {
    pub fn route(&self) -> Option<&RlRouteResponse> {
        self.route.as_ref()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Returns `false` when a request is already running.
    pub fn begin_request(&mut self) -> bool {
        if self.loading {
            return false;
        }
        self.loading = true;
        true
    }

    /// Failures keep the previous route.
    pub fn apply(&mut self, result: &Result<RlRouteResponse, String>) {
        self.loading = false;
        if let Ok(route) = result {
            self.route = Some(route.clone());
        }
    }

    pub fn route_path(&self) -> &[Coordinate] {
        match &self.route {
            Some(route) => &route.route_coordinates,
            None => &[],
        }
    }

    pub fn can_send_feedback(&self) -> bool {
        !self.sending_feedback && !self.route_path().is_empty()
    }

    /// Feedback about the last RL route, or `None` when there is none yet.
    pub fn feedback_request(&mut self, kind: FeedbackKind, notes: &str) -> Option<FeedbackRequest> {
        if !self.can_send_feedback() {
            return None;
        }
        self.sending_feedback = true;
        Some(FeedbackRequest {
            route_coordinates: self.route_path().to_vec(),
            feedback: kind,
            notes: notes.trim().to_string(),
        })
    }

    pub fn feedback_done(&mut self) {
        self.sending_feedback = false;
    }
}

/// One monitoring round; `None` means that endpoint failed.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MonitorUpdate {
    pub agent: Option<RlAgentStats>,
    pub feedback: Option<RlFeedbackStats>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MonitorSnapshot {
    pub agent: Option<RlAgentStats>,
    pub feedback: Option<RlFeedbackStats>,
}

impl MonitorSnapshot {
    pub fn merge(&mut self, update: MonitorUpdate) {
        if update.agent.is_some() {
            self.agent = update.agent;
        }
        if update.feedback.is_some() {
            self.feedback = update.feedback;
        }
    }
}

/// Queries both monitor endpoints concurrently. Errors are logged and absorbed.
pub async fn poll_monitor(client: &SmartRouteClient) -> MonitorUpdate {
    let (agent, feedback) = futures::join!(client.rl_agent_stats(), client.rl_feedback_stats());
    MonitorUpdate {
        agent: agent.map_err(|err| debug!("rl-agent monitor unavailable: {err}")).ok(),
        feedback: feedback
            .map_err(|err| debug!("rl-feedback monitor unavailable: {err}"))
            .ok(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Info,
    Success,
    Error,
}

impl Level {
    pub fn css_class(self) -> &'static str {
        match self {
            Self::Info => "toast-info",
            Self::Success => "toast-success",
            Self::Error => "toast-error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub id: u64,
    pub level: Level,
    pub title: String,
    pub body: String,
}

/// Toasts, newest last. Old ones fall off once the history is full.
#[derive(Debug)]
pub struct NotificationCenter {
    entries: VecDeque<Notification>,
    next_id: u64,
    capacity: usize,
}

impl Default for NotificationCenter {
    fn default() -> Self {
        Self::with_capacity(NOTIFICATION_HISTORY)
    }
}

impl NotificationCenter {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            next_id: 0,
            capacity: capacity.max(1),
        }
    }

    pub fn push(&mut self, level: Level, title: impl Into<String>, body: impl Into<String>) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(Notification {
            id,
            level,
            title: title.into(),
            body: body.into(),
        });
        id
    }

    pub fn dismiss(&mut self, id: u64) {
        self.entries.retain(|entry| entry.id != id);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Notification> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use shared::QualityLabel;

    use super::*;

    #[test]
    fn test_upload_queue_runs_one_at_a_time_in_order() {
        let mut queue = UploadQueue::new();
        queue.enqueue(["a.jpg", "b.jpg", "c.jpg"]);

        assert_eq!(queue.start_next(), Some("a.jpg"));
        assert!(queue.is_busy());
        assert_eq!(queue.start_next(), None);

        queue.finish();
        assert_eq!(queue.start_next(), Some("b.jpg"));
        queue.finish();
        queue.enqueue(["d.jpg"]);
        assert_eq!(queue.start_next(), Some("c.jpg"));
        queue.finish();
        assert_eq!(queue.start_next(), Some("d.jpg"));
        queue.finish();
        assert_eq!(queue.start_next(), None);
        assert!(!queue.is_busy());
        assert_eq!(queue.remaining(), 0);
    }

    #[test]
    fn test_cell_answers() {
        assert_eq!(
            parse_cell_answer(Some(" 3 , 14 ")).unwrap(),
            Some(CellId { row: 3, col: 14 })
        );
        assert_eq!(
            parse_cell_answer(Some(DEFAULT_CELL_ANSWER)).unwrap(),
            Some(CellId { row: 0, col: 0 })
        );
        assert_eq!(parse_cell_answer(None).unwrap(), None);
        assert!(matches!(
            parse_cell_answer(Some("three,four")),
            Err(PlannerError::InvalidCell(_))
        ));
        assert!(parse_cell_answer(Some("7")).is_err());
    }

    #[test]
    fn test_upload_summary() {
        let response = UploadResponse {
            success: true,
            prediction: Some(QualityLabel::VeryPoor),
            confidence: Some(0.873),
            message: None,
        };
        assert_eq!(upload_summary(&response), "Prediction: Very Poor (87.3% confidence)");

        let bare = UploadResponse {
            confidence: None,
            prediction: None,
            ..response
        };
        assert_eq!(upload_summary(&bare), "Prediction: Unknown");
        assert_eq!(percent(0.5), "50.0%");
    }

    fn rl_route() -> RlRouteResponse {
        RlRouteResponse {
            success: true,
            route_coordinates: vec![Coordinate::new(28.6, 77.2), Coordinate::new(28.7, 77.3)],
            green_percentage: 0.64,
            reward: 12.5,
            explanation: "prefers the ring road".into(),
            message: None,
        }
    }

    #[test]
    fn test_feedback_needs_an_rl_route() {
        let mut panel = RlPanel::default();
        assert!(!panel.can_send_feedback());
        assert!(panel.feedback_request(FeedbackKind::Positive, "").is_none());

        assert!(panel.begin_request());
        assert!(!panel.begin_request());
        panel.apply(&Ok(rl_route()));
        assert!(!panel.is_loading());

        let request = panel.feedback_request(FeedbackKind::Negative, "  potholes  ").unwrap();
        assert_eq!(request.route_coordinates.len(), 2);
        assert_eq!(request.feedback, FeedbackKind::Negative);
        assert_eq!(request.notes, "potholes");
        assert!(panel.feedback_request(FeedbackKind::Positive, "").is_none());

        panel.feedback_done();
        assert!(panel.can_send_feedback());
    }

    #[test]
    fn test_failed_rl_request_keeps_previous_route() {
        let mut panel = RlPanel::default();
        panel.begin_request();
        panel.apply(&Ok(rl_route()));
        panel.begin_request();
        panel.apply(&Err("timeout".into()));
        assert_eq!(panel.route().unwrap().reward, 12.5);
    }

    #[test]
    fn test_monitor_failures_keep_previous_values() {
        let mut snapshot = MonitorSnapshot::default();
        let agent = RlAgentStats {
            avg_green_percentage: 0.4,
            avg_reward: 3.0,
        };
        let feedback = RlFeedbackStats {
            avg_feedback: Some(0.5),
            positive: 3,
            negative: 1,
            total: 4,
        };
        snapshot.merge(MonitorUpdate {
            agent: Some(agent),
            feedback: Some(feedback),
        });
        snapshot.merge(MonitorUpdate::default());
        assert_eq!(snapshot.agent, Some(agent));
        assert_eq!(snapshot.feedback, Some(feedback));

        let newer = RlAgentStats {
            avg_green_percentage: 0.6,
            avg_reward: 4.0,
        };
        snapshot.merge(MonitorUpdate {
            agent: Some(newer),
            feedback: None,
        });
        assert_eq!(snapshot.agent, Some(newer));
        assert_eq!(snapshot.feedback, Some(feedback));
    }

    #[test]
    fn test_notification_history_is_bounded() {
        let mut center = NotificationCenter::with_capacity(2);
        let first = center.push(Level::Info, "one", "");
        center.push(Level::Success, "two", "");
        let third = center.push(Level::Error, "three", "boom");
        assert_eq!(center.len(), 2);
        assert!(center.iter().all(|entry| entry.id != first));

        center.dismiss(third);
        let titles: Vec<_> = center.iter().map(|entry| entry.title.as_str()).collect();
        assert_eq!(titles, vec!["two"]);
        assert_eq!(Level::Error.css_class(), "toast-error");
    }
}

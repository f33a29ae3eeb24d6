//! Data message traveling between clients and processing units.

/// Payload sent over a [`Transmission`](crate::Transmission).
///
/// Link metadata (`distance_traveled` and `latency_acquired`) is unset until the message is sent over a link.
/// Forwarding never re-sends a message: a processing unit consumes the inbound message and builds a new one
/// for each next hop, so the type is intentionally not `Clone`.
#[derive(Debug)]
pub struct DataMessage {
    megabytes: f64,
    created_at: f64,
    sent_at: f64,
    distance_traveled: Option<f64>,
    latency_acquired: Option<f64>,
}

impl DataMessage {
    pub fn new(megabytes: f64, created_at: f64, sent_at: f64) -> Self {
        Self {
            megabytes,
            created_at,
            sent_at,
            distance_traveled: None,
            latency_acquired: None,
        }
    }

    /// Builds a message for the next hop that carries the creation time of this one.
    pub fn forward(&self, megabytes: f64, sent_at: f64) -> Self {
        Self::new(megabytes, self.created_at, sent_at)
    }

    /// Payload size in MB.
    pub fn megabytes(&self) -> f64 {
        self.megabytes
    }

    /// Time when the original data was created by a client.
    pub fn created_at(&self) -> f64 {
        self.created_at
    }

    /// Time when this message was sent over its current link.
    pub fn sent_at(&self) -> f64 {
        self.sent_at
    }

    /// Length in km of the last link traversed.
    pub fn distance_traveled(&self) -> Option<f64> {
        self.distance_traveled
    }

    /// Delay in ms acquired on the last link traversed.
    pub fn latency_acquired(&self) -> Option<f64> {
        self.latency_acquired
    }

    pub(crate) fn set_link_metadata(&mut self, distance: f64, latency: f64) {
        debug_assert!(distance >= 0. && latency >= 0.);
        self.distance_traveled = Some(distance);
        self.latency_acquired = Some(latency);
    }
}

#[cfg(test)]
mod tests {
    use super::DataMessage;

    #[test]
    fn test_forward_keeps_creation_time() {
        let mut original = DataMessage::new(0.4, 10., 10.);
        original.set_link_metadata(20., 15.);

        let forwarded = original.forward(0.01, 42.);
        assert_eq!(forwarded.created_at(), 10.);
        assert_eq!(forwarded.sent_at(), 42.);
        assert_eq!(forwarded.megabytes(), 0.01);
        assert_eq!(forwarded.distance_traveled(), None);
        assert_eq!(forwarded.latency_acquired(), None);
    }
}

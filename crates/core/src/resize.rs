//! Debounced re-derivation on container resize

use crate::config::OverlayConfig;
use pdf_overlay_scheduler::Debouncer;
use std::time::{Duration, Instant};

/// Turns a stream of container widths into at most one trigger per quiet window
///
/// Only the latest width of a burst fires. Once disconnected, observations
/// are ignored and nothing fires again.
#[derive(Debug)]
pub struct ResizeCoordinator {
    debouncer: Debouncer<f32>,
    last_width: Option<f32>,
    connected: bool,
}

impl ResizeCoordinator {
    pub fn new(window: Duration) -> Self {
        Self { debouncer: Debouncer::new(window), last_width: None, connected: true }
    }

    pub fn from_config(config: &OverlayConfig) -> Self {
        Self::new(config.resize_debounce())
    }

    /// Record the width the current layer was derived for, without triggering
    ///
    /// A pending trigger was observed before that layer and is dropped.
    pub fn settle(&mut self, width: f32) {
        self.last_width = Some(width);
        if self.debouncer.cancel().is_some() {
            log::debug!("pending resize dropped, layer settled at {width}px");
        }
    }

    /// Forget the last width so observing it again triggers a re-derivation
    pub fn unsettle(&mut self) {
        self.last_width = None;
    }

    /// Record a container size change
    ///
    /// Returns whether the observation was accepted (a connected coordinator
    /// and a new, usable width).
    pub fn observe(&mut self, width: f32, now: Instant) -> bool {
        if !self.connected || !width.is_finite() || width <= 0.0 {
            return false;
        }
        if self.last_width == Some(width) {
            return false;
        }
        self.last_width = Some(width);
        self.debouncer.push(width, now);
        true
    }

    /// Width to re-derive for, once the quiet window has passed
    pub fn poll(&mut self, now: Instant) -> Option<f32> {
        if !self.connected {
            return None;
        }
        let width = self.debouncer.poll(now)?;
        log::debug!("resize settled at {width}px");
        Some(width)
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.debouncer.deadline()
    }

    pub fn is_pending(&self) -> bool {
        self.debouncer.is_pending()
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Stop observing and drop any pending trigger
    pub fn disconnect(&mut self) {
        if self.connected {
            self.connected = false;
            self.debouncer.cancel();
            log::debug!("resize observation released");
        }
    }
}

impl Drop for ResizeCoordinator {
    fn drop(&mut self) {
        self.disconnect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WINDOW: Duration = Duration::from_millis(500);

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn test_burst_fires_once_with_last_width() {
        let t0 = Instant::now();
        let mut resize = ResizeCoordinator::new(WINDOW);

        for (i, width) in [900.0, 850.0, 800.0, 760.0].into_iter().enumerate() {
            assert!(resize.observe(width, t0 + ms(100 * i as u64)));
        }

        assert_eq!(resize.poll(t0 + ms(700)), None);
        assert_eq!(resize.poll(t0 + ms(800)), Some(760.0));
        assert_eq!(resize.poll(t0 + ms(5000)), None);
    }

    #[test]
    fn test_same_width_is_ignored() {
        let t0 = Instant::now();
        let mut resize = ResizeCoordinator::new(WINDOW);
        resize.settle(800.0);

        assert!(!resize.observe(800.0, t0));
        assert!(!resize.is_pending());
        assert!(!resize.observe(0.0, t0));
        assert!(!resize.observe(f32::NAN, t0));
    }

    #[test]
    fn test_settle_drops_pending_trigger() {
        let t0 = Instant::now();
        let mut resize = ResizeCoordinator::new(WINDOW);

        assert!(resize.observe(700.0, t0));
        resize.settle(900.0);

        assert!(!resize.is_pending());
        assert_eq!(resize.poll(t0 + WINDOW), None);
        assert!(!resize.observe(900.0, t0 + WINDOW));
    }

    #[test]
    fn test_unsettle_accepts_same_width_again() {
        let t0 = Instant::now();
        let mut resize = ResizeCoordinator::new(WINDOW);

        assert!(resize.observe(800.0, t0));
        assert_eq!(resize.poll(t0 + WINDOW), Some(800.0));
        assert!(!resize.observe(800.0, t0 + WINDOW));

        resize.unsettle();
        assert!(resize.observe(800.0, t0 + WINDOW));
    }

    #[test]
    fn test_disconnect_drops_pending_trigger() {
        let t0 = Instant::now();
        let mut resize = ResizeCoordinator::new(WINDOW);

        resize.observe(640.0, t0);
        resize.disconnect();

        assert!(!resize.is_connected());
        assert_eq!(resize.poll(t0 + WINDOW), None);
        assert!(!resize.observe(700.0, t0 + WINDOW));
        assert_eq!(resize.deadline(), None);
    }

    #[test]
    fn test_from_config_window() {
        let config = OverlayConfig::default().with_resize_debounce(ms(100));
        let t0 = Instant::now();
        let mut resize = ResizeCoordinator::from_config(&config);

        resize.observe(500.0, t0);
        assert_eq!(resize.deadline(), Some(t0 + ms(100)));
        assert_eq!(resize.poll(t0 + ms(100)), Some(500.0));
    }
}

use serde::Serialize;
use crate::models::coordinate::Coordinate;

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Marker {
    /// `None` addresses the current-position marker.
    pub id: Option<String>,
    pub position: Coordinate,
    pub title: Option<String>,
}

impl Marker {
    pub fn current(position: Coordinate) -> Self {
        Self { id: None, position, title: None }
    }

    pub fn labelled(id: impl Into<String>, position: Coordinate, title: impl Into<String>) -> Self {
        Self { id: Some(id.into()), position, title: Some(title.into()) }
    }
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(transparent)]
pub struct ClickSubscription(pub u64);

/// Rendering surface for the path and markers.
pub trait MapView: Send {
    fn configure(&mut self, center: Coordinate, zoom: u8);
    fn set_marker(&mut self, marker: Marker);
    fn pan_to(&mut self, position: Coordinate);
    fn draw_path(&mut self, path: &[Coordinate]);
    /// Starts click delivery. Clicks reach the owning session as queued events.
    fn on_click(&mut self) -> ClickSubscription;
    fn remove_all_markers(&mut self);
}

/// The map operations as data, for surfaces that live on the other side of a channel.
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(tag = "op")]
pub enum MapCommand {
    Configure { center: Coordinate, zoom: u8 },
    SetMarker { marker: Marker },
    PanTo { position: Coordinate },
    DrawPath { path: Vec<Coordinate> },
    ListenClicks { subscription: ClickSubscription },
    RemoveAllMarkers,
}

/// Forwards every operation as a `MapCommand` to `emit`.
pub struct CommandMapView<F: FnMut(MapCommand) + Send> {
    emit: F,
    next_subscription: u64,
}

impl<F: FnMut(MapCommand) + Send> CommandMapView<F> {
    pub fn new(emit: F) -> Self {
        Self { emit, next_subscription: 0 }
    }
}

impl<F: FnMut(MapCommand) + Send> MapView for CommandMapView<F> {
    fn configure(&mut self, center: Coordinate, zoom: u8) {
        (self.emit)(MapCommand::Configure { center, zoom });
    }

    fn set_marker(&mut self, marker: Marker) {
        (self.emit)(MapCommand::SetMarker { marker });
    }

    fn pan_to(&mut self, position: Coordinate) {
        (self.emit)(MapCommand::PanTo { position });
    }

    fn draw_path(&mut self, path: &[Coordinate]) {
        (self.emit)(MapCommand::DrawPath { path: path.to_vec() });
    }

    fn on_click(&mut self) -> ClickSubscription {
        self.next_subscription += 1;
        let subscription = ClickSubscription(self.next_subscription);
        (self.emit)(MapCommand::ListenClicks { subscription });
        subscription
    }

    fn remove_all_markers(&mut self) {
        (self.emit)(MapCommand::RemoveAllMarkers);
    }
}

/// Keeps a set of markers (current position, route endpoints) alive across
/// `remove_all_markers`, so marker rebuilds only ever tear down the rest.
pub struct PinnedMapView<M: MapView> {
    inner: M,
    pinned: Vec<Marker>,
}

impl<M: MapView> PinnedMapView<M> {
    pub fn new(inner: M) -> Self {
        Self { inner, pinned: Vec::new() }
    }

    /// Places `marker`, replacing any pinned marker with the same id.
    pub fn pin(&mut self, marker: Marker) {
        self.pinned.retain(|pinned| pinned.id != marker.id);
        self.pinned.push(marker.clone());
        self.inner.set_marker(marker);
    }

    pub fn unpin_all(&mut self) {
        self.pinned.clear();
    }

    pub fn pinned(&self) -> &[Marker] {
        &self.pinned
    }
}

impl<M: MapView> MapView for PinnedMapView<M> {
    fn configure(&mut self, center: Coordinate, zoom: u8) {
        self.inner.configure(center, zoom);
    }

    fn set_marker(&mut self, marker: Marker) {
        self.inner.set_marker(marker);
    }

    fn pan_to(&mut self, position: Coordinate) {
        self.inner.pan_to(position);
    }

    fn draw_path(&mut self, path: &[Coordinate]) {
        self.inner.draw_path(path);
    }

    fn on_click(&mut self) -> ClickSubscription {
        self.inner.on_click()
    }

    fn remove_all_markers(&mut self) {
        self.inner.remove_all_markers();
        for marker in &self.pinned {
            self.inner.set_marker(marker.clone());
        }
    }
}

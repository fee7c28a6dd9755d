use crate::models::coordinate::Coordinate;

/// Append-only, ordered record of the positions seen in a session.
#[derive(Debug, Default)]
pub struct PathRecorder {
    points: Vec<Coordinate>,
}

impl PathRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, point: Coordinate) {
        self.points.push(point);
    }

    pub fn reset(&mut self) {
        self.points.clear();
    }

    pub fn snapshot(&self) -> &[Coordinate] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

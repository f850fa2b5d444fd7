use serde::{Deserialize, Serialize};

/// A named marker placed `offset` seconds after the start of an animatable.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TimeEvent {
    pub name: String,
    pub offset: f32,
}

/// Named time markers of an animatable.
///
/// An event name may be placed at several offsets, but only once at each offset. Events are
/// kept sorted by name, then by offset. Time ranges are inclusive at both ends.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TimeEventMap {
    events: Vec<TimeEvent>,
}

impl TimeEventMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TimeEvent> {
        self.events.iter()
    }

    /// Adds an event at `offset`. Fails if the same event is already placed there.
    ///
    /// This operation is O(n) on the number of existing events.
    pub fn add_event(&mut self, name: impl Into<String>, offset: f32) -> bool {
        let name = name.into();
        if self.has_event_on_time(&name, offset) {
            return false;
        }
        let position = self
            .events
            .iter()
            .position(|event| {
                (event.name.as_str(), event.offset.total_cmp(&offset))
                    > (name.as_str(), std::cmp::Ordering::Equal)
            })
            .unwrap_or(self.events.len());
        self.events.insert(position, TimeEvent { name, offset });
        true
    }

    pub fn has_event_on_time(&self, name: &str, offset: f32) -> bool {
        self.events
            .iter()
            .any(|event| event.name == name && event.offset == offset)
    }

    pub fn has_event_for_time_range(&self, name: &str, start: f32, end: f32) -> bool {
        self.events
            .iter()
            .any(|event| event.name == name && in_range(event.offset, start, end))
    }

    /// Offsets of every occurrence of `name`, earliest first.
    pub fn event_time_offsets(&self, name: &str) -> Vec<f32> {
        self.events
            .iter()
            .filter(|event| event.name == name)
            .map(|event| event.offset)
            .collect()
    }

    /// Names of the events placed in `[start, end]`, one entry per occurrence.
    pub fn events_for_time_range(&self, start: f32, end: f32) -> Vec<&str> {
        self.events
            .iter()
            .filter(|event| in_range(event.offset, start, end))
            .map(|event| event.name.as_str())
            .collect()
    }

    pub fn remove_event_on_time(&mut self, name: &str, offset: f32) -> bool {
        let before = self.events.len();
        self.events
            .retain(|event| !(event.name == name && event.offset == offset));
        self.events.len() != before
    }

    /// Removes every occurrence of `name` and returns their offsets.
    pub fn remove_event(&mut self, name: &str) -> Vec<f32> {
        let offsets = self.event_time_offsets(name);
        self.events.retain(|event| event.name != name);
        offsets
    }

    /// Removes the occurrences of `name` placed in `[start, end]`.
    pub fn remove_event_for_time_range(&mut self, name: &str, start: f32, end: f32) -> bool {
        let before = self.events.len();
        self.events
            .retain(|event| !(event.name == name && in_range(event.offset, start, end)));
        self.events.len() != before
    }

    /// Removes every event placed in `[start, end]` and returns their names.
    pub fn remove_events_for_time_range(&mut self, start: f32, end: f32) -> Vec<String> {
        let (removed, kept): (Vec<TimeEvent>, Vec<TimeEvent>) = std::mem::take(&mut self.events)
            .into_iter()
            .partition(|event| in_range(event.offset, start, end));
        self.events = kept;
        removed.into_iter().map(|event| event.name).collect()
    }

    /// Removes all events and returns how many there were.
    pub fn clear(&mut self) -> usize {
        std::mem::take(&mut self.events).len()
    }
}

fn in_range(offset: f32, start: f32, end: f32) -> bool {
    start <= offset && offset <= end
}

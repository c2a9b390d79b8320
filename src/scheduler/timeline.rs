/// A committed crossing time and the vehicle that owns it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Slot<V> {
    /// The crossing time in ticks.
    pub time: f64,
    /// The vehicle the slot is reserved for.
    pub vehicle: V,
}

/// The crossing slots reserved at an intersection, in ascending order of time.
#[derive(Clone, Debug)]
pub struct ReservationTimeline<V> {
    slots: Vec<Slot<V>>,
}

impl<V> Default for ReservationTimeline<V> {
    fn default() -> Self {
        Self { slots: vec![] }
    }
}

impl<V: Copy + PartialEq> ReservationTimeline<V> {
    /// Creates an empty timeline.
    pub fn new() -> Self {
        Default::default()
    }

    /// The number of reserved slots.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether no slots are reserved.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// The latest reserved crossing time.
    pub fn last_time(&self) -> Option<f64> {
        self.slots.last().map(|slot| slot.time)
    }

    /// Returns an iterator over the reserved slots in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = &Slot<V>> {
        self.slots.iter()
    }

    /// Returns an iterator over the reserved crossing times in ascending order.
    pub fn times(&self) -> impl Iterator<Item = f64> + '_ {
        self.slots.iter().map(|slot| slot.time)
    }

    /// Whether the vehicle has a slot.
    pub fn contains(&self, vehicle: V) -> bool {
        self.slots.iter().any(|slot| slot.vehicle == vehicle)
    }

    /// Reserves a slot. Slots with equal times keep their insertion order.
    pub fn commit(&mut self, time: f64, vehicle: V) {
        let idx = self.slots.partition_point(|slot| slot.time <= time);
        self.slots.insert(idx, Slot { time, vehicle });
    }

    /// Releases the vehicle's slot, returning its time.
    pub fn release(&mut self, vehicle: V) -> Option<f64> {
        let idx = self.slots.iter().position(|slot| slot.vehicle == vehicle)?;
        Some(self.slots.remove(idx).time)
    }

    /// Removes every slot at or beyond `horizon`, returning the removed slots.
    pub fn expire_from(&mut self, horizon: f64) -> Vec<Slot<V>> {
        let idx = self.slots.partition_point(|slot| slot.time < horizon);
        self.slots.split_off(idx)
    }

    /// The smallest gap between two consecutive slots.
    pub fn min_gap(&self) -> Option<f64> {
        self.slots
            .windows(2)
            .map(|pair| pair[1].time - pair[0].time)
            .reduce(f64::min)
    }
}

#[cfg(test)]
mod test {
    use super::ReservationTimeline;

    #[test]
    fn commit_keeps_order() {
        let mut timeline = ReservationTimeline::new();
        timeline.commit(10.0, 'a');
        timeline.commit(30.0, 'b');
        timeline.commit(20.0, 'c');
        timeline.commit(20.0, 'd');
        assert_eq!(timeline.times().collect::<Vec<_>>(), [10.0, 20.0, 20.0, 30.0]);
        assert_eq!(
            timeline.iter().map(|s| s.vehicle).collect::<String>(),
            "acdb"
        );
        assert_eq!(timeline.last_time(), Some(30.0));
        assert_eq!(timeline.min_gap(), Some(0.0));
    }

    #[test]
    fn release() {
        let mut timeline = ReservationTimeline::new();
        timeline.commit(10.0, 1);
        timeline.commit(12.0, 2);
        assert_eq!(timeline.release(1), Some(10.0));
        assert_eq!(timeline.release(1), None);
        assert!(!timeline.contains(1));
        assert!(timeline.contains(2));
        assert_eq!(timeline.len(), 1);
    }

    #[test]
    fn expire_from() {
        let mut timeline = ReservationTimeline::new();
        for (time, vehicle) in [(5.0, 1), (9.999, 2), (10.0, 3), (10.001, 4)] {
            timeline.commit(time, vehicle);
        }
        let expired = timeline.expire_from(10.0);
        assert_eq!(expired.iter().map(|s| s.vehicle).collect::<Vec<_>>(), [3, 4]);
        assert_eq!(timeline.times().collect::<Vec<_>>(), [5.0, 9.999]);
        assert!(ReservationTimeline::<u32>::new().expire_from(0.0).is_empty());
    }
}

use crate::ir::MeasureId;

/// A contiguous run of measures at one nesting level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    absolute_number: usize,
    measures: Vec<MeasureId>,
}

impl Segment {
    pub fn new(absolute_number: usize) -> Self {
        Self {
            absolute_number,
            measures: Vec::new(),
        }
    }

    pub fn absolute_number(&self) -> usize {
        self.absolute_number
    }

    pub fn measures(&self) -> &[MeasureId] {
        &self.measures
    }

    pub fn append_measure(&mut self, measure: MeasureId) {
        self.measures.push(measure);
    }

    pub fn remove_last_measure(&mut self) -> Option<MeasureId> {
        self.measures.pop()
    }

    /// Removes the last `count` measures, keeping their order.
    pub fn remove_last_measures(&mut self, count: usize) -> Option<Vec<MeasureId>> {
        if count > self.measures.len() {
            return None;
        }
        let split_at = self.measures.len() - count;
        Some(self.measures.split_off(split_at))
    }

    pub fn last_measure(&self) -> Option<MeasureId> {
        self.measures.last().copied()
    }

    pub fn measures_count(&self) -> usize {
        self.measures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.measures.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::WholeNotes;
    use crate::ir::{Measure, Nodes};

    fn measure(number: &str) -> Measure {
        Measure::new(number.to_string(), 1, 1, false, WholeNotes::whole(1), 1)
    }

    #[test]
    fn test_append_and_remove() {
        let mut nodes = Nodes::new();
        let segment = nodes.add_segment(Segment::new(1));
        let m1 = nodes.create_measure_in_segment(segment, measure("1"));
        let m2 = nodes.create_measure_in_segment(segment, measure("2"));

        assert_eq!(nodes[segment].measures_count(), 2);
        assert_eq!(nodes[segment].last_measure(), Some(m2));
        assert_eq!(nodes.last_measure_of(segment).map(|m| m.number()), Some("2"));

        assert_eq!(nodes[segment].remove_last_measure(), Some(m2));
        assert_eq!(nodes[segment].last_measure(), Some(m1));
        assert_eq!(nodes[segment].remove_last_measure(), Some(m1));
        assert!(nodes[segment].is_empty());
        assert_eq!(nodes[segment].remove_last_measure(), None);
    }

    #[test]
    fn test_remove_last_measures_keeps_order() {
        let mut nodes = Nodes::new();
        let segment = nodes.add_segment(Segment::new(1));
        let ids: Vec<MeasureId> = ["1", "2", "3", "4"]
            .iter()
            .map(|n| nodes.create_measure_in_segment(segment, measure(n)))
            .collect();

        assert_eq!(nodes[segment].remove_last_measures(5), None);
        assert_eq!(
            nodes[segment].remove_last_measures(2),
            Some(vec![ids[2], ids[3]])
        );
        assert_eq!(nodes[segment].measures(), &ids[..2]);
    }
}

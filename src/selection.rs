//! Selected, filtered and hovered point bookkeeping.
use std::collections::HashSet;

/// Outcome of [`SelectionState::select`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectOutcome {
    /// The selection did not change.
    Unchanged,
    /// An empty replacement cleared a non-empty selection.
    Deselected { previous: Vec<usize> },
    /// The selection changed.
    Selected { previous: Vec<usize> },
}

/// Outcome of [`SelectionState::hover`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct HoverOutcome {
    pub previous: Option<usize>,
    pub current: Option<usize>,
}

impl HoverOutcome {
    /// Whether a new point became hovered.
    pub fn entered(&self) -> bool {
        self.current.is_some() && self.current != self.previous
    }

    /// Whether the hovered point was cleared.
    pub fn left(&self) -> bool {
        self.current.is_none() && self.previous.is_some()
    }

    /// Whether the frame needs to be redrawn.
    pub fn needs_redraw(&self) -> bool {
        self.current.is_some() || self.previous.is_some()
    }
}

/// Outcome of [`SelectionState::filter`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterOutcome {
    /// Selected points that remain visible.
    pub visible_selection: Vec<usize>,
    /// Whether the hovered point became invisible.
    pub hover_hidden: bool,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
struct Filter {
    indices: Vec<usize>,
    set: HashSet<usize>,
}

/// Membership of points in the selection, the filter and the hover state.
///
/// All stored indices are valid for the current point count, and while a
/// filter is active also part of it.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SelectionState {
    num_points: usize,
    selected: Vec<usize>,
    selected_set: HashSet<usize>,
    filter: Option<Filter>,
    hovered: Option<usize>,
}

impl SelectionState {
    pub fn new(num_points: usize) -> Self {
        Self {
            num_points,
            ..Default::default()
        }
    }

    /// Adapts the state to a new point set, pruning indices that are no
    /// longer valid. The filter is dropped unless `keep_filter` is set.
    pub fn reset(&mut self, num_points: usize, keep_filter: bool) {
        self.num_points = num_points;
        if !keep_filter {
            self.filter = None;
        }

        let selected = std::mem::take(&mut self.selected);
        self.assign(selected);
        self.hovered = self.hovered.filter(|&idx| self.is_valid(idx));
    }

    pub fn num_points(&self) -> usize {
        self.num_points
    }

    pub fn selected(&self) -> &[usize] {
        &self.selected
    }

    pub fn is_selected(&self, idx: usize) -> bool {
        self.selected_set.contains(&idx)
    }

    pub fn hovered(&self) -> Option<usize> {
        self.hovered
    }

    pub fn is_filtered(&self) -> bool {
        self.filter.is_some()
    }

    /// The visible points while a filter is active.
    pub fn filtered(&self) -> Option<&[usize]> {
        self.filter.as_ref().map(|f| f.indices.as_slice())
    }

    /// Whether the point exists and is visible.
    pub fn is_valid(&self, idx: usize) -> bool {
        idx < self.num_points && self.filter.as_ref().map_or(true, |f| f.set.contains(&idx))
    }

    /// Replaces or extends the selection.
    ///
    /// Invalid and duplicate indices are dropped, the remaining ones keep
    /// their order. The outcome is [`SelectOutcome::Unchanged`] when the new
    /// selection holds the same set of points, even in a different order; the
    /// previous order is kept then.
    pub fn select(&mut self, indices: &[usize], merge: bool) -> SelectOutcome {
        let previous = self.selected.clone();

        if merge {
            let mut union = previous.clone();
            union.extend(indices.iter().copied().filter(|i| !self.selected_set.contains(i)));
            self.assign(union);
            if self.selected.len() == previous.len() {
                return SelectOutcome::Unchanged;
            }
            return SelectOutcome::Selected { previous };
        }

        let mut candidate = SelectionState {
            num_points: self.num_points,
            filter: self.filter.clone(),
            ..Default::default()
        };
        candidate.assign(indices.to_vec());

        if candidate.selected_set == self.selected_set {
            return SelectOutcome::Unchanged;
        }

        if candidate.selected.is_empty() {
            self.clear_selection();
            return SelectOutcome::Deselected { previous };
        }

        self.selected = candidate.selected;
        self.selected_set = candidate.selected_set;
        SelectOutcome::Selected { previous }
    }

    /// Clears the selection, returning the previously selected points.
    pub fn deselect(&mut self) -> Vec<usize> {
        let previous = std::mem::take(&mut self.selected);
        self.selected_set.clear();
        previous
    }

    /// Sets the hovered point. Invalid indices unset it.
    pub fn hover(&mut self, idx: Option<usize>) -> HoverOutcome {
        let previous = self.hovered;
        self.hovered = idx.filter(|&i| self.is_valid(i));
        HoverOutcome {
            previous,
            current: self.hovered,
        }
    }

    /// Restricts the visible points. Invalid and duplicate indices are
    /// dropped.
    pub fn filter(&mut self, indices: &[usize]) -> FilterOutcome {
        let mut filter = Filter::default();
        for &idx in indices {
            if idx < self.num_points && filter.set.insert(idx) {
                filter.indices.push(idx);
            }
        }

        let visible_selection = self
            .selected
            .iter()
            .copied()
            .filter(|i| filter.set.contains(i))
            .collect();
        let hover_hidden = self.hovered.map_or(false, |h| !filter.set.contains(&h));

        self.filter = Some(filter);
        FilterOutcome {
            visible_selection,
            hover_hidden,
        }
    }

    /// Removes the filter. Returns whether a filter was active.
    pub fn unfilter(&mut self) -> bool {
        self.filter.take().is_some()
    }

    fn clear_selection(&mut self) {
        self.selected.clear();
        self.selected_set.clear();
    }

    fn assign(&mut self, indices: Vec<usize>) {
        self.clear_selection();
        for idx in indices {
            if self.is_valid(idx) && self.selected_set.insert(idx) {
                self.selected.push(idx);
            }
        }
    }
}

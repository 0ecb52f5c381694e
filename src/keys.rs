/// Overlays that can take over keyboard input from the gallery grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Overlay {
    Viewer,
    PagePicker,
    DateInput,
}

/// Stack of active key grabs. The top entry receives key events; when the
/// stack is empty keys go to the grid.
#[derive(Debug, Default)]
pub struct KeyRouter {
    grabs: Vec<Overlay>,
}

impl KeyRouter {
    pub fn grab(&mut self, overlay: Overlay) {
        self.grabs.retain(|existing| *existing != overlay);
        self.grabs.push(overlay);
    }

    pub fn release(&mut self, overlay: Overlay) -> bool {
        let before = self.grabs.len();
        self.grabs.retain(|existing| *existing != overlay);
        before != self.grabs.len()
    }

    pub fn active(&self) -> Option<Overlay> {
        self.grabs.last().copied()
    }

    pub fn len(&self) -> usize {
        self.grabs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.grabs.is_empty()
    }
}

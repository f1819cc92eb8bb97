use crate::shared::constants::MODEL_REPOSITORY_URL;

/// A downloadable whisper.cpp model from the public model repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CatalogEntry {
    pub id: &'static str,
    pub file_name: &'static str,
    pub info: &'static str,
}

impl CatalogEntry {
    pub fn download_url(&self) -> String {
        format!("{MODEL_REPOSITORY_URL}/resolve/main/{}", self.file_name)
    }

    /// Browser-facing page for the model file.
    pub fn page_url(&self) -> String {
        format!("{MODEL_REPOSITORY_URL}/blob/main/{}", self.file_name)
    }
}

pub const CATALOG: &[CatalogEntry] = &[
    CatalogEntry {
        id: "whisper-large-v3",
        file_name: "ggml-large-v3.bin",
        info: "Speed: \u{2605}\u{2606}\u{2606}\u{2606}\u{2606} | Accuracy: \u{2605}\u{2605}\u{2605}\u{2605}\u{2605} (Best Accuracy)",
    },
    CatalogEntry {
        id: "whisper-large-v3-turbo",
        file_name: "ggml-large-v3-turbo.bin",
        info: "Speed: \u{2605}\u{2605}\u{2605}\u{2606}\u{2606} | Accuracy: \u{2605}\u{2605}\u{2605}\u{2605}\u{2605} (Fast, High Accuracy, Recommended)",
    },
    CatalogEntry {
        id: "whisper-tiny",
        file_name: "ggml-tiny.bin",
        info: "Speed: \u{2605}\u{2605}\u{2605}\u{2605}\u{2605} | Accuracy: \u{2605}\u{2606}\u{2606}\u{2606}\u{2606} (Fastest)",
    },
    CatalogEntry {
        id: "whisper-base",
        file_name: "ggml-base.bin",
        info: "Speed: \u{2605}\u{2605}\u{2605}\u{2605}\u{2606} | Accuracy: \u{2605}\u{2605}\u{2606}\u{2606}\u{2606} (Fast)",
    },
    CatalogEntry {
        id: "whisper-small",
        file_name: "ggml-small.bin",
        info: "Speed: \u{2605}\u{2605}\u{2605}\u{2606}\u{2606} | Accuracy: \u{2605}\u{2605}\u{2605}\u{2606}\u{2606} (Balanced)",
    },
    CatalogEntry {
        id: "whisper-medium",
        file_name: "ggml-medium.bin",
        info: "Speed: \u{2605}\u{2605}\u{2606}\u{2606}\u{2606} | Accuracy: \u{2605}\u{2605}\u{2605}\u{2605}\u{2606} (High Accuracy)",
    },
];

pub fn lookup(id: &str) -> Option<&'static CatalogEntry> {
    CATALOG.iter().find(|entry| entry.id == id)
}

pub fn ids() -> impl Iterator<Item = &'static str> {
    CATALOG.iter().map(|entry| entry.id)
}

//! Bundled sample PPS records.
//!
//! Used when the dashboard runs offline (`kind = "sample"`) or when the
//! configured failure policy replaces a failed remote fetch. The records use
//! the same loose typing as the live feed: counts arrive as strings or
//! numbers and a few fields are missing.

use serde_json::{Value, json};

use crate::ingest::{FetchedRecords, RecordSource};
use crate::logging::Component;
use crate::model::FetchError;

#[derive(Debug, Default, Clone, Copy)]
pub struct SampleSource;

impl SampleSource {
    pub fn new() -> Self {
        SampleSource
    }
}

impl RecordSource for SampleSource {
    fn component(&self) -> Component {
        Component::Sample
    }

    fn describe(&self) -> String {
        "bundled sample".to_string()
    }

    fn fetch_records(&self) -> Result<FetchedRecords, FetchError> {
        Ok(FetchedRecords {
            records: sample_records(),
            origin: Component::Sample,
        })
    }
}

/// The canned record set.
pub fn sample_records() -> Value {
    json!([
        {"negeri": "KELANTAN", "daerah": "KOTA BHARU", "nama_pps": "SK KAMPUNG SIREH", "jumlah_keluarga": "42", "jumlah_mangsa": "156"},
        {"negeri": "KELANTAN", "daerah": "PASIR MAS", "nama_pps": "SMK SRI KIAMBANG", "jumlah_keluarga": "61", "jumlah_mangsa": "233"},
        {"negeri": "KELANTAN", "daerah": "TUMPAT", "nama_pps": "DEWAN ORANG RAMAI WAKAF BHARU", "jumlah_keluarga": "18", "jumlah_mangsa": "70"},
        {"negeri": "TERENGGANU", "daerah": "KEMAMAN", "nama_pps": "SK CHUKAI", "jumlah_keluarga": "25", "jumlah_mangsa": "98"},
        {"negeri": "TERENGGANU", "daerah": "DUNGUN", "nama_pps": "SMK SURA", "jumlah_keluarga": "12", "jumlah_mangsa": 47},
        {"negeri": "PAHANG", "daerah": "TEMERLOH", "nama_pps": "SMK TEMERLOH JAYA", "jumlah_keluarga": "30", "jumlah_mangsa": "112"},
        {"negeri": "PAHANG", "daerah": "PEKAN", "nama_pps": "SK PEKAN", "jumlah_keluarga": "9", "jumlah_mangsa": ""},
        {"negeri": "JOHOR", "daerah": "SEGAMAT", "nama_pps": "SK BUKIT SIPUT", "jumlah_keluarga": "20", "jumlah_mangsa": "81"},
        {"negeri": "JOHOR", "daerah": "KLUANG", "nama_pps": "DEWAN SERBAGUNA KLUANG", "jumlah_keluarga": "7", "jumlah_mangsa": "26"},
        {"negeri": "JOHOR", "daerah": "BATU PAHAT", "nama_pps": "SMK PARIT RAJA", "jumlah_keluarga": "14"},
        {"negeri": "PERAK", "daerah": "HILIR PERAK", "nama_pps": "SK TELUK INTAN", "jumlah_keluarga": "11", "jumlah_mangsa": "39"},
        {"negeri": "SELANGOR", "daerah": "KLANG", "nama_pps": "DEWAN SRI ANDALAS", "jumlah_keluarga": "16", "jumlah_mangsa": "64"},
        {"negeri": "SABAH", "daerah": "BEAUFORT", "nama_pps": "SK BEAUFORT", "jumlah_keluarga": "8", "jumlah_mangsa": "N/A"},
        {"negeri": null, "daerah": "TIDAK DIKETAHUI", "nama_pps": "PPS SEMENTARA", "jumlah_keluarga": "2", "jumlah_mangsa": "5"}
    ])
}

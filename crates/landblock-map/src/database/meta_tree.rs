use crate::error::StoreError;
use crate::DocumentId;

use landblock_core::archived_buf::{archive_value, ArchivedBuf};
use landblock_core::rkyv::AlignedVec;
use rkyv::{Archive, Deserialize, Serialize};
use sled::Tree;

/// Everything known about a document besides its projection bytes.
#[derive(Archive, Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[archive(check_bytes)]
pub struct DocumentMeta {
    pub kind: String,
}

pub fn open_meta_tree(store_name: &str, db: &sled::Db) -> sled::Result<Tree> {
    db.open_tree(format!("{}-meta", store_name))
}

pub fn encode_meta(id: &DocumentId, meta: &DocumentMeta) -> Result<AlignedVec, StoreError> {
    archive_value::<_, 64>(meta).map_err(|e| StoreError::Metadata {
        id: id.clone(),
        reason: e.to_string(),
    })
}

pub fn decode_meta(id: &DocumentId, bytes: &[u8]) -> Result<DocumentMeta, StoreError> {
    ArchivedBuf::<DocumentMeta>::check(bytes)
        .map(|buf| buf.deserialize())
        .map_err(|e| StoreError::Metadata {
            id: id.clone(),
            reason: e.to_string(),
        })
}

// ████████╗███████╗███████╗████████╗
// ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝
//    ██║   █████╗  ███████╗   ██║
//    ██║   ██╔══╝  ╚════██║   ██║
//    ██║   ███████╗███████║   ██║
//    ╚═╝   ╚══════╝╚══════╝   ╚═╝

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn meta_round_trip_and_poisoned_meta() {
        let id = DocumentId::from("doc");
        let meta = DocumentMeta {
            kind: "terrain".to_owned(),
        };
        let bytes = encode_meta(&id, &meta).unwrap();
        assert_eq!(decode_meta(&id, bytes.as_slice()).unwrap(), meta);

        assert!(matches!(
            decode_meta(&id, &[0xff; 3]),
            Err(StoreError::Metadata { .. })
        ));
    }
}

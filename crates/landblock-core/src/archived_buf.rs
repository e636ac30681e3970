use crate::NoSharedAllocSerializer;

use rkyv::ser::Serializer;
use rkyv::validation::validators::DefaultValidator;
use rkyv::{
    archived_root, check_archived_root, AlignedVec, Archive, Archived, CheckBytes, Deserialize,
    Infallible, Serialize,
};
use std::error::Error;
use std::fmt;
use std::marker::PhantomData;

/// An aligned copy of bytes that have been validated as an [`Archived<T>`].
///
/// Bytes coming out of a store carry no alignment guarantee, so they are always copied into an [`AlignedVec`] before
/// validation.
#[derive(Clone)]
pub struct ArchivedBuf<T> {
    bytes: AlignedVec,
    marker: PhantomData<T>,
}

impl<T> ArchivedBuf<T>
where
    T: Archive,
    for<'a> T::Archived: CheckBytes<DefaultValidator<'a>>,
{
    /// Copies `bytes` and checks that they hold a valid archived `T`.
    pub fn check(bytes: &[u8]) -> Result<Self, ArchiveError> {
        let mut aligned = AlignedVec::with_capacity(bytes.len());
        aligned.extend_from_slice(bytes);
        check_archived_root::<T>(aligned.as_slice())
            .map_err(|e| ArchiveError::Invalid(format!("{:?}", e)))?;
        Ok(Self {
            bytes: aligned,
            marker: PhantomData,
        })
    }

    pub fn deserialize(&self) -> T
    where
        T::Archived: Deserialize<T, Infallible>,
    {
        // Infallible.
        self.as_ref().deserialize(&mut Infallible).unwrap()
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl<T> AsRef<Archived<T>> for ArchivedBuf<T>
where
    T: Archive,
{
    fn as_ref(&self) -> &Archived<T> {
        // SAFETY: only constructed through `check`, which validated these exact bytes.
        unsafe { archived_root::<T>(self.bytes.as_slice()) }
    }
}

/// Serializes `value` into a fresh [`AlignedVec`], using `N` bytes of scratch space before falling back to the heap.
pub fn archive_value<T, const N: usize>(value: &T) -> Result<AlignedVec, ArchiveError>
where
    T: Serialize<NoSharedAllocSerializer<N>>,
{
    let mut serializer = NoSharedAllocSerializer::<N>::default();
    serializer
        .serialize_value(value)
        .map_err(|e| ArchiveError::Serialize(format!("{:?}", e)))?;
    Ok(serializer.into_serializer().into_inner())
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ArchiveError {
    Invalid(String),
    Serialize(String),
}

impl fmt::Display for ArchiveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Invalid(reason) => write!(f, "invalid archive: {}", reason),
            Self::Serialize(reason) => write!(f, "failed to serialize archive: {}", reason),
        }
    }
}

impl Error for ArchiveError {}

// ████████╗███████╗███████╗████████╗
// ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝
//    ██║   █████╗  ███████╗   ██║
//    ██║   ██╔══╝  ╚════██║   ██║
//    ██║   ███████╗███████║   ██║
//    ╚═╝   ╚══════╝╚══════╝   ╚═╝

use crate::error::Result;

#[cfg(feature = "parking-lot")]
pub(crate) use parking_lot::{Mutex, MutexGuard};
#[cfg(not(feature = "parking-lot"))]
pub(crate) use std::sync::{Mutex, MutexGuard};

/// Process-wide lock taken by every generator built with
/// [`LockScope::Global`](crate::LockScope::Global).
#[cfg(feature = "parking-lot")]
pub(crate) static GLOBAL_LOCK: Mutex<()> = parking_lot::const_mutex(());
#[cfg(not(feature = "parking-lot"))]
pub(crate) static GLOBAL_LOCK: Mutex<()> = Mutex::new(());

#[cfg(feature = "parking-lot")]
#[inline]
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>> {
    Ok(mutex.lock())
}

#[cfg(not(feature = "parking-lot"))]
#[inline]
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>> {
    Ok(mutex.lock()?)
}

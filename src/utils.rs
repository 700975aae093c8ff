/// Allocates a `T` directly on the heap with every byte set to zero, without building it on the
/// stack first.
///
/// # Safety
///
/// The all-zero bit pattern must be a valid value of `T`.
pub unsafe fn boxed_and_zeroed<T>() -> Box<T> {
    let layout = std::alloc::Layout::new::<T>();
    let ptr = std::alloc::alloc_zeroed(layout);
    if ptr.is_null() {
        std::alloc::handle_alloc_error(layout);
    }
    Box::from_raw(ptr.cast())
}

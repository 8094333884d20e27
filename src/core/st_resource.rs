use std::{
    cell::{Ref, RefCell, RefMut},
    rc::Rc,
};

/// A single-threaded, reference-counted resource with interior mutability.
///
/// `StResource` lets several owners on the render thread share one value. The
/// world manager and the renderer collaborator both hold a clone of a chunk's
/// handle: the manager mutates the voxel grid, the renderer reads the instance
/// buffers between frames.
///
/// # Type Parameters
/// - `T`: The type of the contained resource
///
/// # Examples
///
/// ```
/// use voxel_world::core::StResource;
///
/// let resource = StResource::new(vec![1, 2, 3]);
/// let clone = resource.clone();
///
/// // All clones share the same underlying data
/// clone.get_mut().push(4);
/// assert_eq!(resource.get().len(), 4);
/// assert!(resource.ptr_eq(&clone));
/// ```
///
/// # Panics
/// - Panics if a mutable borrow is requested while any other borrow is alive
///
/// # Performance Considerations
/// - No atomics; not `Send`, so it can never leak onto a worker thread
pub struct StResource<T> {
    resource: Rc<RefCell<T>>,
}

impl<T> StResource<T> {
    /// Creates a new `StResource` containing the given value.
    ///
    /// # Arguments
    /// * `resource` - The value to be stored in the resource
    pub fn new(resource: T) -> Self {
        Self {
            resource: Rc::new(RefCell::new(resource)),
        }
    }

    /// Returns a guard that allows reading the contained value.
    pub fn get(&self) -> Ref<'_, T> {
        self.resource.borrow()
    }

    /// Returns a guard that allows modifying the contained value.
    pub fn get_mut(&self) -> RefMut<'_, T> {
        self.resource.borrow_mut()
    }

    /// Whether two handles point at the same value.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.resource, &other.resource)
    }
}

impl<T> Clone for StResource<T> {
    fn clone(&self) -> Self {
        Self {
            resource: self.resource.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_the_value() {
        let a = StResource::new(String::from("stone"));
        let b = a.clone();
        b.get_mut().push_str("_bricks");
        assert_eq!(&*a.get(), "stone_bricks");
        assert!(a.ptr_eq(&b));
        assert!(!a.ptr_eq(&StResource::new(String::new())));
    }
}

use std::cell::{Cell, Ref, RefCell};
use std::rc::Rc;

use ndarray::{ArrayD, IxDyn};

/// A parameter variable: a dense f32 buffer with a shape, a `need_grad` flag
/// and an optional gradient buffer.
///
/// `Variable` is a handle with reference identity: cloning it yields another
/// handle to the same logical parameter, and mutating the data through one
/// handle is observed by all of them. Two handles can be compared with
/// [`Variable::ptr_eq`].
#[derive(Clone)]
pub struct Variable {
    inner: Rc<Inner>,
}

struct Inner {
    shape: Vec<usize>,
    /// Shared with unlinked views, hence the extra indirection.
    data: Rc<RefCell<ArrayD<f32>>>,
    grad: RefCell<Option<ArrayD<f32>>>,
    need_grad: Cell<bool>,
}

impl Variable {
    /// Creates a variable of the given shape with zeroed data.
    pub fn new(shape: &[usize], need_grad: bool) -> Self {
        Self {
            inner: Rc::new(Inner {
                shape: shape.to_vec(),
                data: Rc::new(RefCell::new(ArrayD::zeros(IxDyn(shape)))),
                grad: RefCell::new(None),
                need_grad: Cell::new(need_grad),
            }),
        }
    }

    pub fn shape(&self) -> &[usize] {
        &self.inner.shape
    }

    /// Number of elements.
    pub fn numel(&self) -> usize {
        self.inner.shape.iter().product()
    }

    pub fn need_grad(&self) -> bool {
        self.inner.need_grad.get()
    }

    pub fn set_need_grad(&self, need_grad: bool) {
        self.inner.need_grad.set(need_grad);
    }

    /// Borrows the data buffer.
    pub fn data(&self) -> Ref<'_, ArrayD<f32>> {
        self.inner.data.borrow()
    }

    /// Replaces the data buffer. The new values must have the variable's shape.
    pub fn set_data(&self, values: ArrayD<f32>) {
        assert_eq!(
            values.shape(),
            self.inner.shape.as_slice(),
            "data shape does not match variable shape"
        );
        *self.inner.data.borrow_mut() = values;
    }

    /// Data flattened to a row-major vector.
    pub fn to_flat_vec(&self) -> Vec<f32> {
        self.inner.data.borrow().iter().copied().collect()
    }

    pub fn grad(&self) -> Option<ArrayD<f32>> {
        self.inner.grad.borrow().clone()
    }

    pub fn set_grad(&self, grad: Option<ArrayD<f32>>) {
        if let Some(values) = &grad {
            assert_eq!(
                values.shape(),
                self.inner.shape.as_slice(),
                "gradient shape does not match variable shape"
            );
        }
        *self.inner.grad.borrow_mut() = grad;
    }

    /// Returns a view sharing this variable's data storage but carrying its
    /// own `need_grad` flag and its own gradient buffer.
    ///
    /// The flag starts out equal to this variable's and can be flipped on the
    /// view without affecting the original.
    pub fn unlinked(&self) -> Self {
        Self {
            inner: Rc::new(Inner {
                shape: self.inner.shape.clone(),
                data: Rc::clone(&self.inner.data),
                grad: RefCell::new(None),
                need_grad: Cell::new(self.inner.need_grad.get()),
            }),
        }
    }

    /// Whether two handles refer to the same logical parameter.
    pub fn ptr_eq(a: &Self, b: &Self) -> bool {
        Rc::ptr_eq(&a.inner, &b.inner)
    }

    /// Whether two variables share the same data storage, as a variable and
    /// its unlinked views do.
    pub fn shares_data(a: &Self, b: &Self) -> bool {
        Rc::ptr_eq(&a.inner.data, &b.inner.data)
    }
}

impl core::fmt::Debug for Variable {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Variable")
            .field("shape", &self.inner.shape)
            .field("need_grad", &self.inner.need_grad.get())
            .finish()
    }
}

// Waker built on top of Rc<Task> to avoid the Send + Sync requirement of std::task::Wake.
//
// The simulation is strictly single-threaded: wakers never leave the thread that created the task,
// which is what makes handing an Rc to the RawWaker vtable sound here.

use std::mem::ManuallyDrop;
use std::rc::Rc;
use std::task::{RawWaker, RawWakerVTable, Waker};

use super::task::Task;

static VTABLE: RawWakerVTable = RawWakerVTable::new(clone_raw, wake_raw, wake_by_ref_raw, drop_raw);

// Creates an owned waker that holds one strong reference to the task.
pub(crate) fn waker_for(task: &Rc<Task>) -> Waker {
    let ptr = Rc::into_raw(task.clone()).cast::<()>();
    unsafe { Waker::from_raw(RawWaker::new(ptr, &VTABLE)) }
}

unsafe fn clone_raw(data: *const ()) -> RawWaker {
    unsafe { Rc::increment_strong_count(data.cast::<Task>()) };
    RawWaker::new(data, &VTABLE)
}

unsafe fn wake_raw(data: *const ()) {
    let task = unsafe { Rc::from_raw(data.cast::<Task>()) };
    task.schedule();
}

unsafe fn wake_by_ref_raw(data: *const ()) {
    // borrow the reference owned by the waker without consuming it
    let task = ManuallyDrop::new(unsafe { Rc::from_raw(data.cast::<Task>()) });
    task.schedule();
}

unsafe fn drop_raw(data: *const ()) {
    drop(unsafe { Rc::from_raw(data.cast::<Task>()) });
}

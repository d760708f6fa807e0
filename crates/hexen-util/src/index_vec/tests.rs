use super::*;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct TestId(u32);

impl Idx for TestId {
    fn from_usize(idx: usize) -> Self {
        TestId(idx as u32)
    }

    fn index(self) -> usize {
        self.0 as usize
    }
}

#[test]
fn push_assigns_sequential_indices() {
    let mut vec: IndexVec<TestId, &str> = IndexVec::new();
    let a = vec.push("function");
    let b = vec.push("block");
    assert_eq!(a, TestId(0));
    assert_eq!(b, TestId(1));
    assert_eq!(vec.len(), 2);
}

#[test]
fn index_returns_the_pushed_value() {
    let mut vec: IndexVec<TestId, &str> = IndexVec::new();
    let id = vec.push("loop");
    assert_eq!(vec[id], "loop");
}

#[test]
fn index_mut_updates_in_place() {
    let mut vec: IndexVec<TestId, i32> = IndexVec::new();
    let id = vec.push(1);
    vec[id] += 41;
    assert_eq!(vec[id], 42);
}

#[test]
fn iter_enumerated_pairs_each_index_with_its_value() {
    let mut vec: IndexVec<TestId, &str> = IndexVec::new();
    vec.push("function");
    vec.push("block");
    vec.push("loop");
    let seen: Vec<_> = vec.iter_enumerated().collect();
    assert_eq!(seen, vec![(TestId(0), &"function"), (TestId(1), &"block"), (TestId(2), &"loop")]);
}

#[test]
fn new_vec_is_empty() {
    let vec: IndexVec<TestId, i32> = IndexVec::new();
    assert!(vec.is_empty());
    assert_eq!(vec.len(), 0);
}

#[test]
fn default_is_equivalent_to_new() {
    let vec: IndexVec<TestId, i32> = IndexVec::default();
    assert!(vec.is_empty());
}

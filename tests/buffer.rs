use std::collections::VecDeque;

use codec_stream::Buffer;
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Op {
    Append(Vec<u8>),
    Consume(usize),
    Compact,
    Grow(usize),
    Expand,
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        proptest::collection::vec(any::<u8>(), 0..48).prop_map(Op::Append),
        (0usize..64).prop_map(Op::Consume),
        Just(Op::Compact),
        (0usize..160).prop_map(Op::Grow),
        Just(Op::Expand),
    ]
}

proptest! {
    #[test]
    fn cursors_stay_ordered_and_bytes_stay_put(
        capacity in 1usize..64,
        ceiling in 1usize..128,
        fixed in any::<bool>(),
        ops in proptest::collection::vec(op(), 0..64),
    ) {
        let mut buf = if fixed {
            Buffer::fixed(capacity)
        } else {
            Buffer::heap(capacity, ceiling)
        };
        // Reference model of the pending bytes.
        let mut model: VecDeque<u8> = VecDeque::new();

        for op in ops {
            match op {
                Op::Append(bytes) => {
                    let n = buf.append(&bytes);
                    prop_assert!(n <= bytes.len());
                    model.extend(&bytes[..n]);
                }
                Op::Consume(n) => {
                    let n = n.min(buf.len());
                    buf.consume(n);
                    model.drain(..n);
                }
                Op::Compact => buf.compact(),
                Op::Grow(n) => {
                    let before = buf.capacity();
                    match buf.grow(n) {
                        Ok(()) => prop_assert_eq!(buf.capacity(), before.max(n)),
                        Err(_) => prop_assert_eq!(buf.capacity(), before),
                    }
                }
                Op::Expand => {
                    let _ = buf.expand();
                }
            }
            prop_assert!(buf.read_pos() <= buf.write_pos());
            prop_assert!(buf.write_pos() <= buf.capacity());
            prop_assert!(buf.capacity() <= buf.ceiling());
            let expected: Vec<u8> = model.iter().copied().collect();
            prop_assert_eq!(buf.unread(), expected.as_slice());
        }
    }
}

//! Property tests for checksum arithmetic and request encoding.

use opsis_protocol::{checksum, Request, SignatureMap, MAX_REQUEST_FRAME};
use proptest::prelude::*;

fn any_request() -> impl Strategy<Value = Request> {
    prop_oneof![
        Just(Request::Version),
        Just(Request::Resolution),
        Just(Request::FrameRate),
        Just(Request::ReverseVector),
        any::<u8>().prop_map(Request::Brightness),
        (0u16..512, 0u16..512).prop_map(|(s0, s1)| Request::Servos { s0, s1 }),
        any::<(u8, u8, u8)>().prop_map(|(red, green, blue)| Request::Led { red, green, blue }),
        any::<u8>().prop_map(|max_blocks| Request::Blocks {
            signatures: SignatureMap::ALL,
            max_blocks,
        }),
        any::<i16>().prop_map(|angle| Request::NextTurn { angle }),
        any::<i16>().prop_map(|angle| Request::DefaultTurn { angle }),
        any::<u8>().prop_map(|index| Request::Vector { index }),
        (any::<u16>(), any::<u16>(), any::<bool>())
            .prop_map(|(x, y, saturate)| Request::PixelColor { x, y, saturate }),
    ]
}

proptest! {
    #[test]
    fn checksum_is_stable(payload in proptest::collection::vec(any::<u8>(), 0..256)) {
        prop_assert_eq!(checksum(&payload), checksum(&payload));
    }

    #[test]
    fn checksum_detects_any_single_bit_flip(
        mut payload in proptest::collection::vec(any::<u8>(), 1..256),
        index in any::<proptest::sample::Index>(),
        bit in 0u8..8,
    ) {
        let original = checksum(&payload);
        let position = index.index(payload.len());
        payload[position] ^= 1 << bit;
        // A flipped bit shifts the sum by a nonzero power of two below 2^16
        prop_assert_ne!(checksum(&payload), original);
    }

    #[test]
    fn encoded_requests_have_well_formed_headers(request in any_request()) {
        let mut buffer = [0u8; MAX_REQUEST_FRAME];
        let len = request.encode(&mut buffer).unwrap();

        prop_assert!(len >= 4 && len <= MAX_REQUEST_FRAME);
        // Plain sync word, little-endian
        prop_assert_eq!(&buffer[0..2], &[0xAE, 0xC1]);
        prop_assert_eq!(buffer[2], request.opcode());
        // Length byte counts the payload only
        prop_assert_eq!(usize::from(buffer[3]), len - 4);

        let vec = request.encode_to_vec();
        prop_assert_eq!(&vec[..], &buffer[..len]);
    }
}

/*! Macros for test functions
*/

macro_rules! encode_decode_test (
    ($test:ident, $value:expr) => (
        #[test]
        fn $test() {
            fn round_trip<T>(value: T)
            where
                T: lsrpc_binary_io::ToBytes + lsrpc_binary_io::FromBytes + PartialEq + std::fmt::Debug,
            {
                let mut buf = [0; 1024 * 256];
                let (_, size) = value.to_bytes((&mut buf, 0)).unwrap();
                let (rest, decoded) = T::from_bytes(&buf[..size]).unwrap();
                assert!(rest.is_empty());
                assert_eq!(decoded, value);
            }
            round_trip($value);
        }
    )
);

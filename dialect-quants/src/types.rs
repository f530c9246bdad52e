digit_layout::layout!(BD4; [32] in size_of::<crate::BlockDialect>() as _);

#[test]
fn test_layout() {
    assert_eq!("bd4", BD4.to_string());
}

/// Build a [`Row`](crate::row::Row) from `column => value` pairs.
///
/// ```ignore
/// let row = row! { "parent" => "P1", "created" => 4 };
/// ```
#[macro_export]
macro_rules! row {
    () => {
        $crate::row::Row::new()
    };
    ( $( $column:expr => $value:expr ),+ $(,)? ) => {
        $crate::row::Row::new()
            $( .with($column, $value) )+
    };
}

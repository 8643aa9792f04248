#[macro_export]
/// Generates a String similar to output of `dbg` but without printing
macro_rules! format_dbg {
    ($dbg_expr:expr) => {
        format!(
            "[{}:{}] {}: {:?}",
            file!(),
            line!(),
            stringify!($dbg_expr),
            $dbg_expr
        )
    };
    () => {
        format!("[{}:{}]", file!(), line!())
    };
}

#[macro_export]
/// Asserts that two floats are within an absolute tolerance, printing both on failure
macro_rules! assert_near {
    ($left:expr, $right:expr, $tol:expr) => {
        let (left, right, tol): (f64, f64, f64) = ($left, $right, $tol);
        assert!(
            (left - right).abs() <= tol,
            "{} = {} is not within {} of {} = {}",
            stringify!($left),
            left,
            tol,
            stringify!($right),
            right
        );
    };
}

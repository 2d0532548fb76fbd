//! Assertions that are only compiled in when the `extra_assertions` feature
//! is enabled. They guard expensive integrity checks that would dominate the
//! runtime of every allocation if they were always on.

#[cfg(feature = "extra_assertions")]
macro_rules! extra_assert {
    ( $condition:expr $( , $args:expr )* ) => {
        assert!($condition $( , $args )* )
    }
}

#[cfg(not(feature = "extra_assertions"))]
macro_rules! extra_assert {
    ( $condition:expr $( , $args:expr )* ) => {
        if false {
            let _ = $condition;
            $( let _ = $args; )*
        }
    }
}

#[cfg(feature = "extra_assertions")]
macro_rules! extra_assert_eq {
    ( $left:expr , $right:expr $( , $args:expr )* ) => {
        assert_eq!($left, $right $( , $args )* )
    }
}

#[cfg(not(feature = "extra_assertions"))]
macro_rules! extra_assert_eq {
    ( $left:expr , $right:expr $( , $args:expr )* ) => {
        if false {
            let _ = $left;
            let _ = $right;
            $( let _ = $args; )*
        }
    }
}

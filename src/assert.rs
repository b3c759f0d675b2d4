//! Assertion macros for fixture hooks.
//!
//! `expect_*!` records a failure and evaluates to `false`, letting the hook carry on.
//! `require_*!` records the same failure and returns from the enclosing hook, so the
//! lifecycle moves straight on to Teardown.
//!
//! ```ignore
//! async fn run(&mut self, cx: &TestContext) {
//!     expect_eq!(cx, 2 + 2, 4);
//!     require_valid!(cx, self.connection);
//!     expect_strcaseeq!(cx, "Thunderdome", "THUNDERDOME");
//! }
//! ```

#[doc(hidden)]
#[macro_export]
macro_rules! __untested_site {
    ($severity:ident, $lhs:expr, $rhs:expr) => {
        $crate::context::Site::new(
            file!(),
            line!(),
            $lhs,
            $rhs,
            $crate::context::Severity::$severity,
        )
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __untested_binary {
    ($method:ident, $severity:ident, $cx:expr, $a:expr, $b:expr) => {
        $cx.$method(
            &$crate::__untested_site!($severity, stringify!($a), stringify!($b)),
            &$a,
            &$b,
        )
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __untested_unary {
    ($method:ident, $severity:ident, $cx:expr, $a:expr) => {
        $cx.$method(
            &$crate::__untested_site!($severity, stringify!($a), "none"),
            $a,
        )
    };
    (ref $method:ident, $severity:ident, $cx:expr, $a:expr) => {
        $cx.$method(
            &$crate::__untested_site!($severity, stringify!($a), "none"),
            &$a,
        )
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __untested_str {
    ($method:ident, $mode:ident, $severity:ident, $cx:expr, $a:expr, $b:expr) => {
        $cx.$method(
            &$crate::__untested_site!($severity, stringify!($a), stringify!($b)),
            ::core::convert::AsRef::<str>::as_ref(&$a),
            ::core::convert::AsRef::<str>::as_ref(&$b),
            $crate::context::CaseMode::$mode,
        )
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __untested_near {
    ($severity:ident, $cx:expr, $a:expr, $b:expr, $tolerance:expr) => {
        $cx.check_near(
            &$crate::__untested_site!($severity, stringify!($a), stringify!($b)),
            ($a) as f64,
            ($b) as f64,
            ($tolerance) as f64,
        )
    };
}

// Non-fatal checks.

#[macro_export]
macro_rules! expect_eq {
    ($cx:expr, $a:expr, $b:expr $(,)?) => {
        $crate::__untested_binary!(check_eq, Expect, $cx, $a, $b)
    };
}

#[macro_export]
macro_rules! expect_ne {
    ($cx:expr, $a:expr, $b:expr $(,)?) => {
        $crate::__untested_binary!(check_ne, Expect, $cx, $a, $b)
    };
}

#[macro_export]
macro_rules! expect_gt {
    ($cx:expr, $a:expr, $b:expr $(,)?) => {
        $crate::__untested_binary!(check_gt, Expect, $cx, $a, $b)
    };
}

#[macro_export]
macro_rules! expect_ge {
    ($cx:expr, $a:expr, $b:expr $(,)?) => {
        $crate::__untested_binary!(check_ge, Expect, $cx, $a, $b)
    };
}

#[macro_export]
macro_rules! expect_lt {
    ($cx:expr, $a:expr, $b:expr $(,)?) => {
        $crate::__untested_binary!(check_lt, Expect, $cx, $a, $b)
    };
}

#[macro_export]
macro_rules! expect_le {
    ($cx:expr, $a:expr, $b:expr $(,)?) => {
        $crate::__untested_binary!(check_le, Expect, $cx, $a, $b)
    };
}

#[macro_export]
macro_rules! expect_near {
    ($cx:expr, $a:expr, $b:expr, $tolerance:expr $(,)?) => {
        $crate::__untested_near!(Expect, $cx, $a, $b, $tolerance)
    };
}

#[macro_export]
macro_rules! expect_streq {
    ($cx:expr, $a:expr, $b:expr $(,)?) => {
        $crate::__untested_str!(check_str_eq, Sensitive, Expect, $cx, $a, $b)
    };
}

#[macro_export]
macro_rules! expect_strne {
    ($cx:expr, $a:expr, $b:expr $(,)?) => {
        $crate::__untested_str!(check_str_ne, Sensitive, Expect, $cx, $a, $b)
    };
}

#[macro_export]
macro_rules! expect_strcaseeq {
    ($cx:expr, $a:expr, $b:expr $(,)?) => {
        $crate::__untested_str!(check_str_eq, Insensitive, Expect, $cx, $a, $b)
    };
}

#[macro_export]
macro_rules! expect_strcasene {
    ($cx:expr, $a:expr, $b:expr $(,)?) => {
        $crate::__untested_str!(check_str_ne, Insensitive, Expect, $cx, $a, $b)
    };
}

#[macro_export]
macro_rules! expect_true {
    ($cx:expr, $a:expr $(,)?) => {
        $crate::__untested_unary!(check_true, Expect, $cx, $a)
    };
}

#[macro_export]
macro_rules! expect_false {
    ($cx:expr, $a:expr $(,)?) => {
        $crate::__untested_unary!(check_false, Expect, $cx, $a)
    };
}

#[macro_export]
macro_rules! expect_valid {
    ($cx:expr, $a:expr $(,)?) => {
        $crate::__untested_unary!(ref check_valid, Expect, $cx, $a)
    };
}

#[macro_export]
macro_rules! expect_invalid {
    ($cx:expr, $a:expr $(,)?) => {
        $crate::__untested_unary!(ref check_invalid, Expect, $cx, $a)
    };
}

// Fatal checks: leave the current hook on failure.

#[macro_export]
macro_rules! require_eq {
    ($cx:expr, $a:expr, $b:expr $(,)?) => {
        if !$crate::__untested_binary!(check_eq, Assert, $cx, $a, $b) {
            return;
        }
    };
}

#[macro_export]
macro_rules! require_ne {
    ($cx:expr, $a:expr, $b:expr $(,)?) => {
        if !$crate::__untested_binary!(check_ne, Assert, $cx, $a, $b) {
            return;
        }
    };
}

#[macro_export]
macro_rules! require_gt {
    ($cx:expr, $a:expr, $b:expr $(,)?) => {
        if !$crate::__untested_binary!(check_gt, Assert, $cx, $a, $b) {
            return;
        }
    };
}

#[macro_export]
macro_rules! require_ge {
    ($cx:expr, $a:expr, $b:expr $(,)?) => {
        if !$crate::__untested_binary!(check_ge, Assert, $cx, $a, $b) {
            return;
        }
    };
}

#[macro_export]
macro_rules! require_lt {
    ($cx:expr, $a:expr, $b:expr $(,)?) => {
        if !$crate::__untested_binary!(check_lt, Assert, $cx, $a, $b) {
            return;
        }
    };
}

#[macro_export]
macro_rules! require_le {
    ($cx:expr, $a:expr, $b:expr $(,)?) => {
        if !$crate::__untested_binary!(check_le, Assert, $cx, $a, $b) {
            return;
        }
    };
}

#[macro_export]
macro_rules! require_near {
    ($cx:expr, $a:expr, $b:expr, $tolerance:expr $(,)?) => {
        if !$crate::__untested_near!(Assert, $cx, $a, $b, $tolerance) {
            return;
        }
    };
}

#[macro_export]
macro_rules! require_streq {
    ($cx:expr, $a:expr, $b:expr $(,)?) => {
        if !$crate::__untested_str!(check_str_eq, Sensitive, Assert, $cx, $a, $b) {
            return;
        }
    };
}

#[macro_export]
macro_rules! require_strne {
    ($cx:expr, $a:expr, $b:expr $(,)?) => {
        if !$crate::__untested_str!(check_str_ne, Sensitive, Assert, $cx, $a, $b) {
            return;
        }
    };
}

#[macro_export]
macro_rules! require_strcaseeq {
    ($cx:expr, $a:expr, $b:expr $(,)?) => {
        if !$crate::__untested_str!(check_str_eq, Insensitive, Assert, $cx, $a, $b) {
            return;
        }
    };
}

#[macro_export]
macro_rules! require_strcasene {
    ($cx:expr, $a:expr, $b:expr $(,)?) => {
        if !$crate::__untested_str!(check_str_ne, Insensitive, Assert, $cx, $a, $b) {
            return;
        }
    };
}

#[macro_export]
macro_rules! require_true {
    ($cx:expr, $a:expr $(,)?) => {
        if !$crate::__untested_unary!(check_true, Assert, $cx, $a) {
            return;
        }
    };
}

#[macro_export]
macro_rules! require_false {
    ($cx:expr, $a:expr $(,)?) => {
        if !$crate::__untested_unary!(check_false, Assert, $cx, $a) {
            return;
        }
    };
}

#[macro_export]
macro_rules! require_valid {
    ($cx:expr, $a:expr $(,)?) => {
        if !$crate::__untested_unary!(ref check_valid, Assert, $cx, $a) {
            return;
        }
    };
}

#[macro_export]
macro_rules! require_invalid {
    ($cx:expr, $a:expr $(,)?) => {
        if !$crate::__untested_unary!(ref check_invalid, Assert, $cx, $a) {
            return;
        }
    };
}

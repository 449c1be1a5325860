//! Macros used in the crate source.

macro_rules! precondition_memory_range {
    ($ptr:expr, $len:expr) => {
        mirai_annotations::precondition!(!($ptr.is_null()), "null pointer is never valid");
        mirai_annotations::precondition!(
            ($ptr as usize).checked_add($len).is_some(),
            "memory range wraps the address space"
        );
    };
}

macro_rules! debug_precondition_page_range {
    ($ptr:expr, $len:expr, $page_size:expr) => {
        mirai_annotations::debug_checked_precondition!($page_size.is_power_of_two(), "page size must be a power of two");
        mirai_annotations::debug_checked_precondition_eq!(($ptr as usize) % $page_size, 0, "region must start on a page boundary");
        mirai_annotations::debug_checked_precondition_eq!($len % $page_size, 0, "region must span whole pages");
    };
}

pub(crate) use {debug_precondition_page_range, precondition_memory_range};

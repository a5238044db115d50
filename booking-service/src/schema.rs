diesel::table! {
    availabilities (id) {
        id -> Uuid,
        local_date -> Date,
        status -> Varchar,
        product_id -> Uuid,
        vacancies -> Int4,
        available -> Bool,
        price -> Numeric,
        currency -> Varchar,
        created_at -> Nullable<Timestamptz>,
        updated_at -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    booking_units (id) {
        id -> Uuid,
        booking_id -> Uuid,
        reference -> Varchar,
        position -> Int4,
        price -> Numeric,
        currency -> Varchar,
        created_at -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    bookings (id) {
        id -> Uuid,
        status -> Varchar,
        availability_id -> Uuid,
        units -> Int4,
        price -> Numeric,
        currency -> Varchar,
        created_at -> Nullable<Timestamptz>,
        updated_at -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    products (id) {
        id -> Uuid,
        name -> Varchar,
        capacity -> Int4,
        price -> Numeric,
        currency -> Varchar,
        created_at -> Nullable<Timestamptz>,
    }
}

diesel::joinable!(availabilities -> products (product_id));
diesel::joinable!(booking_units -> bookings (booking_id));
diesel::joinable!(bookings -> availabilities (availability_id));

diesel::allow_tables_to_appear_in_same_query!(
    availabilities,
    booking_units,
    bookings,
    products,
);
